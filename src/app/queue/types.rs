//! Core data structures for the task queue
//!
//! This module defines the queue item, the handle returned to submitters and
//! the statistics snapshot.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::errors::{QueueError, QueueResult};

/// Type-erased action; resolves to `true` when it settled without panicking
pub(crate) type Job = Box<dyn FnOnce() -> BoxFuture<'static, bool> + Send>;

/// A queued unit of work
///
/// The action owns its completion channel, so settling the item delivers the
/// outcome to the submitter's [`TaskHandle`] and nothing else.
pub(crate) struct QueueItem {
    /// Sequence number in submission order
    pub seq: u64,
    pub run: Job,
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem").field("seq", &self.seq).finish()
    }
}

/// Future resolving to the result of one queued action
///
/// Dropping the handle does not cancel the action; it still runs in its
/// turn and its result is discarded.
#[derive(Debug)]
pub struct TaskHandle<T> {
    queue: String,
    rx: oneshot::Receiver<QueueResult<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(queue: String, rx: oneshot::Receiver<QueueResult<T>>) -> Self {
        Self { queue, rx }
    }

    /// Name of the queue the action was submitted to
    pub fn queue_name(&self) -> &str {
        &self.queue
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = QueueResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Dropped {
                queue: self.queue.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Snapshot of queue counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Actions submitted since creation
    pub total_enqueued: u64,
    /// Actions that settled normally
    pub completed_count: u64,
    /// Actions that panicked
    pub panicked_count: u64,
    /// Actions waiting for their turn
    pub pending_count: usize,
    /// Whether an action is executing right now
    pub busy: bool,
}

impl QueueStats {
    /// Actions that have settled either way
    pub fn settled_count(&self) -> u64 {
        self.completed_count + self.panicked_count
    }
}
