//! Prelude module for Source Finder
//!
//! Re-exports the items most integrations need with a single
//! `use source_finder::prelude::*;`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use source_finder::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//!     let cache = ResultCache::open(&CacheConfig::in_memory(), clock).await?;
//!     let hash = ContentHash::digest(b"image bytes");
//!     assert!(cache.lookup("1688", &hash).await?.is_none());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    AppContext, CacheConfig, ClientConfig, Clock, ContentHash, CurrencyConfig, CurrencyRateService,
    ImageClient, ImageSource, Product, Provider, ProviderBackend, ProviderRegistry, ResultCache,
    SystemClock, TaskQueue, Transaction,
};
pub use crate::config::AppConfig;
pub use crate::server::{ConnectionManager, ServerMessage};

// Commonly used constants
pub use crate::constants::{DEFAULT_POINTS, DEFAULT_WINDOW, ENTRY_TTL, SWEEP_INTERVAL};

pub use std::sync::Arc;

pub use tokio;
