//! TTL-filtered result cache
//!
//! Search results are cached per provider and image content hash. Entries
//! are immutable and never updated in place: a write always adds a record,
//! and a read returns the newest record that has not expired. Expired
//! records are inert until an operator purges them.
//!
//! # Module Organization
//!
//! - [`config`] - Backend selection, root directory and TTL
//! - [`record`] - Persisted entry and lookup key
//! - [`store`] - The `CacheStore` trait and statistics
//! - [`memory`] - In-process store
//! - [`file`] - JSON-lines file store
//! - [`manager`] - `ResultCache`, the facade providers talk to
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use source_finder::app::cache::{CacheConfig, ResultCache};
//! use source_finder::app::clock::SystemClock;
//! use source_finder::app::ContentHash;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ResultCache::open(&CacheConfig::in_memory(), Arc::new(SystemClock)).await?;
//! let hash = ContentHash::digest(b"image bytes");
//!
//! if cache.lookup("1688", &hash).await?.is_none() {
//!     cache.store("1688", &hash, Vec::new()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod file;
pub mod manager;
pub mod memory;
pub mod record;
pub mod store;

#[cfg(test)]
mod tests;

pub use config::{CacheBackend, CacheConfig};
pub use file::FileStore;
pub use manager::ResultCache;
pub use memory::MemoryStore;
pub use record::{CacheEntry, CacheKey};
pub use store::{CacheStats, CacheStore};
