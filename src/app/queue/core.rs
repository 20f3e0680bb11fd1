//! Core task queue implementation
//!
//! A `TaskQueue` runs submitted async actions one at a time, strictly in
//! submission order. Submitting never blocks: the action is stored and a
//! drain loop is spawned if none is running. The drain loop keeps pulling
//! items until the queue is empty, so every settled action automatically
//! starts the next one.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::errors::QueueError;

use super::state::QueueState;
use super::types::{Job, QueueItem, QueueStats, TaskHandle};

/// FIFO, single-concurrency async executor
#[derive(Debug, Clone)]
pub struct TaskQueue {
    name: Arc<str>,
    state: Arc<Mutex<QueueState>>,
}

impl TaskQueue {
    /// Create an empty queue; `name` shows up in logs and errors
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(QueueState::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit an action and return a handle to its result
    ///
    /// The action starts once every earlier action in this queue has
    /// settled. A panic inside the action is caught and reported only to
    /// this action's handle as [`QueueError::ActionPanicked`]; the queue
    /// keeps draining.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime, since the drain loop is
    /// spawned on it.
    pub fn enqueue<F, Fut, T>(&self, action: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let queue_name = Arc::clone(&self.name);

        let job: Job = Box::new(move || {
            async move {
                let outcome = AssertUnwindSafe(async move { action().await })
                    .catch_unwind()
                    .await;

                let settled = outcome.map_err(|_| {
                    error!(queue = %queue_name, "Queued action panicked");
                    QueueError::ActionPanicked {
                        queue: queue_name.to_string(),
                    }
                });
                let completed = settled.is_ok();

                // The submitter may have dropped its handle; the action still ran.
                let _ = tx.send(settled);
                completed
            }
            .boxed()
        });

        let start_drain = lock(&self.state).push(|seq| QueueItem { seq, run: job });
        if start_drain {
            tokio::spawn(Self::drain(Arc::clone(&self.name), Arc::clone(&self.state)));
        }

        TaskHandle::new(self.name.to_string(), rx)
    }

    /// Number of actions waiting behind the one executing
    pub fn len(&self) -> usize {
        lock(&self.state).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an action is executing
    pub fn is_busy(&self) -> bool {
        lock(&self.state).is_busy()
    }

    pub fn stats(&self) -> QueueStats {
        lock(&self.state).stats()
    }

    async fn drain(name: Arc<str>, state: Arc<Mutex<QueueState>>) {
        debug!(queue = %name, "Drain loop started");
        loop {
            let next = lock(&state).pop_next();
            let Some(item) = next else {
                debug!(queue = %name, "Queue empty, drain loop finished");
                return;
            };

            debug!(queue = %name, seq = item.seq, "Running queued action");
            let completed = (item.run)().await;
            lock(&state).record_settled(completed);
        }
    }
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
