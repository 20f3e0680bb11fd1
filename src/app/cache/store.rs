//! Storage seam of the result cache

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::CacheResult;

use super::record::{CacheEntry, CacheKey};

/// Entry counts reported by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries held, valid or not
    pub total_entries: usize,
    /// Entries that have not yet expired
    pub valid_entries: usize,
}

impl CacheStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CacheEntry>, now: DateTime<Utc>) -> Self {
        entries.into_iter().fold(Self::default(), |mut stats, entry| {
            stats.total_entries += 1;
            if entry.is_valid_at(now) {
                stats.valid_entries += 1;
            }
            stats
        })
    }

    pub fn expired_entries(&self) -> usize {
        self.total_entries - self.valid_entries
    }
}

/// A TTL-filtered record store
///
/// Implementations never update entries in place: `insert` always adds a
/// record and `find_valid` chooses among the unexpired ones.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Newest entry for `key` whose expiry is at or after `now`
    async fn find_valid(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>>;

    async fn insert(&self, entry: CacheEntry) -> CacheResult<()>;

    async fn stats(&self, now: DateTime<Utc>) -> CacheResult<CacheStats>;

    /// Drop every entry that expired before `now`, returning how many went
    async fn purge_expired(&self, now: DateTime<Utc>) -> CacheResult<usize>;
}
