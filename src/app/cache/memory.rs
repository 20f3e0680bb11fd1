//! In-process cache store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::errors::CacheResult;

use super::record::{newest_valid, CacheEntry, CacheKey};
use super::store::{CacheStats, CacheStore};

/// Cache store holding entries in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn find_valid(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        Ok(newest_valid(entries.iter(), key, now).cloned())
    }

    async fn insert(&self, entry: CacheEntry) -> CacheResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn stats(&self, now: DateTime<Utc>) -> CacheResult<CacheStats> {
        Ok(CacheStats::from_entries(self.entries.read().await.iter(), now))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.is_valid_at(now));
        Ok(before - entries.len())
    }
}
