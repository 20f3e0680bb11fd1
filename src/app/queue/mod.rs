//! Single-flight FIFO task queue
//!
//! Each provider owns one `TaskQueue`. Actions submitted to it run one at a
//! time in submission order, so a provider's browser-like session is never
//! driven by two searches at once.
//!
//! # Features
//!
//! - **Non-overlap**: at most one action executes at any instant
//! - **FIFO**: actions start in the order they were submitted
//! - **Failure isolation**: a panicking action settles only its own handle
//! - **Non-blocking submit**: `enqueue` returns immediately with a handle
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use source_finder::app::queue::TaskQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = TaskQueue::new("1688");
//!
//! let first = queue.enqueue(|| async { 1 });
//! let second = queue.enqueue(|| async { 2 });
//!
//! assert_eq!(first.await?, 1);
//! assert_eq!(second.await?, 2);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use core::TaskQueue;
pub use types::{QueueStats, TaskHandle};
