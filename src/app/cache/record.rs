//! Persisted cache records
//!
//! Entries are immutable once written. Several entries for the same key may
//! coexist; readers pick the newest one that has not expired and ignore the
//! rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::hash::ContentHash;
use crate::app::models::Product;
use crate::constants::cache;

/// Lookup key of a cached search result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: String,
    pub provider_name: String,
    pub content_hash: ContentHash,
}

impl CacheKey {
    /// Key of a provider search result for an image
    pub fn source(provider_name: impl Into<String>, content_hash: ContentHash) -> Self {
        Self {
            kind: cache::SOURCE_KIND.to_string(),
            provider_name: provider_name.into(),
            content_hash,
        }
    }
}

/// One stored search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub kind: String,
    pub provider_name: String,
    pub content_hash: ContentHash,
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn matches(&self, key: &CacheKey) -> bool {
        self.content_hash == key.content_hash
            && self.provider_name == key.provider_name
            && self.kind == key.kind
    }

    /// An entry stays valid up to and including its expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at >= now
    }
}

/// Pick the newest still-valid entry for `key`
pub fn newest_valid<'a, I>(entries: I, key: &CacheKey, now: DateTime<Utc>) -> Option<&'a CacheEntry>
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    entries
        .into_iter()
        .filter(|entry| entry.matches(key) && entry.is_valid_at(now))
        .max_by_key(|entry| entry.created_at)
}
