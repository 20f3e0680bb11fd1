//! Result cache facade used by providers
//!
//! `ResultCache` stamps entries with the clock's time and the configured TTL
//! and hides which store keeps them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::app::clock::Clock;
use crate::app::hash::ContentHash;
use crate::app::models::Product;
use crate::errors::{CacheError, CacheResult};

use super::config::{CacheBackend, CacheConfig};
use super::file::FileStore;
use super::memory::MemoryStore;
use super::record::{CacheEntry, CacheKey};
use super::store::{CacheStats, CacheStore};

/// TTL-stamping view over a [`CacheStore`]
#[derive(Debug, Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl ResultCache {
    /// Wrap an existing store
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidTtl` if `ttl` does not fit a calendar
    /// duration.
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl: Duration) -> CacheResult<Self> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CacheError::InvalidTtl {
            reason: e.to_string(),
        })?;
        Ok(Self { store, clock, ttl })
    }

    /// Open the store selected by `config`
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the file store cannot be opened or the TTL is
    /// out of range.
    pub async fn open(config: &CacheConfig, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        let store: Arc<dyn CacheStore> = match config.backend {
            CacheBackend::File => {
                let root = config.resolve_root()?;
                Arc::new(FileStore::open(&root).await?)
            }
            CacheBackend::Memory => {
                info!("Using in-memory result cache");
                Arc::new(MemoryStore::new())
            }
        };
        Self::new(store, clock, config.ttl)
    }

    /// Newest unexpired result for `provider` and `hash`
    pub async fn lookup(&self, provider: &str, hash: &ContentHash) -> CacheResult<Option<CacheEntry>> {
        let key = CacheKey::source(provider, *hash);
        let found = self.store.find_valid(&key, self.clock.now()).await?;
        debug!(provider, %hash, hit = found.is_some(), "Cache lookup");
        Ok(found)
    }

    /// Write a new entry valid from now until now + TTL
    pub async fn store(
        &self,
        provider: &str,
        hash: &ContentHash,
        products: Vec<Product>,
    ) -> CacheResult<CacheEntry> {
        let created_at = self.clock.now();
        let entry = CacheEntry {
            kind: crate::constants::cache::SOURCE_KIND.to_string(),
            provider_name: provider.to_string(),
            content_hash: *hash,
            products,
            created_at,
            expire_at: created_at + self.ttl,
        };
        self.store.insert(entry.clone()).await?;
        Ok(entry)
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        self.store.stats(self.clock.now()).await
    }

    /// Remove expired entries; only ever invoked by an operator
    pub async fn purge_expired(&self) -> CacheResult<usize> {
        self.store.purge_expired(self.clock.now()).await
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }
}
