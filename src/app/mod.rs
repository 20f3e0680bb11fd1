//! Core application logic for Source Finder
//!
//! This module contains everything behind the client-facing server: the
//! single-flight task queue, the result cache, image fetching, the currency
//! rate service and the search providers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use source_finder::app::{TaskQueue, ContentHash};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = TaskQueue::new("1688");
//! let hash = ContentHash::digest(b"image bytes");
//!
//! // Actions run one at a time, in submission order
//! let handle = queue.enqueue(move || async move { hash.to_hex() });
//! println!("{}", handle.await?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod context;
pub mod currency;
pub mod hash;
pub mod models;
pub mod provider;
pub mod queue;
pub mod retry;
pub mod transaction;

// Re-export main public API
pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use client::{ClientConfig, ImageClient, ImageSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::AppContext;
pub use currency::{CurrencyConfig, CurrencyRateService, Rate};
pub use hash::ContentHash;
pub use models::{Product, ProductCurrency};
pub use provider::{Provider, ProviderBackend, ProviderRegistry, TaskOutcome};
pub use queue::{QueueStats, TaskHandle, TaskQueue};
pub use transaction::Transaction;
