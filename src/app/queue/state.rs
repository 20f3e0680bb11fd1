//! Internal state of a task queue
//!
//! Holds the FIFO of waiting items and the busy flag. All transitions happen
//! under the queue's mutex.

use std::collections::VecDeque;

use tracing::debug;

use super::types::{QueueItem, QueueStats};

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    /// Waiting items in submission order
    items: VecDeque<QueueItem>,
    /// True while a drain loop owns the queue
    busy: bool,
    next_seq: u64,
    total_enqueued: u64,
    completed_count: u64,
    panicked_count: u64,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item; returns true if the caller must start a drain loop
    pub fn push(&mut self, build: impl FnOnce(u64) -> QueueItem) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(build(seq));
        self.total_enqueued += 1;

        if self.busy {
            debug!("Queue busy, item {} waits behind {} others", seq, self.items.len() - 1);
            false
        } else {
            self.busy = true;
            true
        }
    }

    /// Take the next item, releasing the busy flag when the queue is empty
    pub fn pop_next(&mut self) -> Option<QueueItem> {
        let item = self.items.pop_front();
        if item.is_none() {
            self.busy = false;
        }
        item
    }

    pub fn record_settled(&mut self, completed: bool) {
        if completed {
            self.completed_count += 1;
        } else {
            self.panicked_count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            total_enqueued: self.total_enqueued,
            completed_count: self.completed_count,
            panicked_count: self.panicked_count,
            pending_count: self.items.len(),
            busy: self.busy,
        }
    }
}
