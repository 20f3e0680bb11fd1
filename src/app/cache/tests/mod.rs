//! Tests for the result cache and its stores

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::app::cache::{CacheConfig, CacheStore, FileStore, MemoryStore, ResultCache};
use crate::app::clock::{Clock, ManualClock};
use crate::app::hash::ContentHash;
use crate::app::models::Product;
use crate::constants::cache::ENTRIES_FILE;

fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
    ))
}

fn sample_products() -> Vec<Product> {
    vec![Product::new(
        "Ceramic mug",
        "https://img.example/mug.jpg",
        "https://detail.example/mug",
        Some("10.00".to_string()),
    )]
}

#[tokio::test]
async fn test_store_sets_expiry_to_write_time_plus_ttl() {
    // Test that a write is stamped with now and now + 5h
    let clock = start_clock();
    let cache = ResultCache::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        Duration::from_secs(5 * 60 * 60),
    )
    .unwrap();
    let hash = ContentHash::digest(b"mug");

    let entry = cache.store("1688", &hash, sample_products()).await.unwrap();

    assert_eq!(entry.created_at, clock.now());
    assert_eq!(entry.expire_at - entry.created_at, chrono::Duration::hours(5));
    assert_eq!(entry.kind, "source");
}

#[tokio::test]
async fn test_lookup_respects_expiry_and_provider() {
    let clock = start_clock();
    let cache = ResultCache::new(
        Arc::new(MemoryStore::new()),
        clock.clone(),
        Duration::from_secs(5 * 60 * 60),
    )
    .unwrap();
    let hash = ContentHash::digest(b"mug");
    cache.store("1688", &hash, sample_products()).await.unwrap();

    assert!(cache.lookup("1688", &hash).await.unwrap().is_some());
    assert!(cache.lookup("taobao", &hash).await.unwrap().is_none());

    // Exactly at expiry the entry still counts
    clock.advance(chrono::Duration::hours(5));
    assert!(cache.lookup("1688", &hash).await.unwrap().is_some());

    clock.advance(chrono::Duration::seconds(1));
    assert!(cache.lookup("1688", &hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_newer_write_wins_and_old_entries_remain() {
    let clock = start_clock();
    let store = Arc::new(MemoryStore::new());
    let cache = ResultCache::new(store.clone(), clock.clone(), Duration::from_secs(3600)).unwrap();
    let hash = ContentHash::digest(b"mug");

    cache.store("1688", &hash, Vec::new()).await.unwrap();
    clock.advance(chrono::Duration::minutes(10));
    cache.store("1688", &hash, sample_products()).await.unwrap();

    let found = cache.lookup("1688", &hash).await.unwrap().unwrap();
    assert_eq!(found.products.len(), 1);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_file_store_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let clock = start_clock();
    let hash = ContentHash::digest(b"mug");

    {
        let store = FileStore::open(temp_dir.path()).await.unwrap();
        let cache = ResultCache::new(Arc::new(store), clock.clone(), Duration::from_secs(3600)).unwrap();
        cache.store("1688", &hash, sample_products()).await.unwrap();
    }

    let reopened = FileStore::open(temp_dir.path()).await.unwrap();
    let cache = ResultCache::new(Arc::new(reopened), clock, Duration::from_secs(3600)).unwrap();
    let found = cache.lookup("1688", &hash).await.unwrap().unwrap();
    assert_eq!(found.products, sample_products());
}

#[tokio::test]
async fn test_file_store_skips_corrupt_lines() {
    let temp_dir = TempDir::new().unwrap();
    let clock = start_clock();
    let hash = ContentHash::digest(b"mug");

    {
        let cache = ResultCache::new(
            Arc::new(FileStore::open(temp_dir.path()).await.unwrap()),
            clock.clone(),
            Duration::from_secs(3600),
        )
        .unwrap();
        cache.store("1688", &hash, sample_products()).await.unwrap();
    }

    let path = temp_dir.path().join(ENTRIES_FILE);
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    std::fs::write(&path, content).unwrap();

    let store = FileStore::open(temp_dir.path()).await.unwrap();
    let stats = store.stats(clock.now()).await.unwrap();
    assert_eq!(stats.total_entries, 1);
}

#[tokio::test]
async fn test_purge_removes_only_expired_entries() {
    let temp_dir = TempDir::new().unwrap();
    let clock = start_clock();
    let cache = ResultCache::new(
        Arc::new(FileStore::open(temp_dir.path()).await.unwrap()),
        clock.clone(),
        Duration::from_secs(3600),
    )
    .unwrap();

    cache.store("1688", &ContentHash::digest(b"old"), Vec::new()).await.unwrap();
    clock.advance(chrono::Duration::minutes(90));
    cache.store("1688", &ContentHash::digest(b"new"), Vec::new()).await.unwrap();

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.expired_entries(), 1);

    assert_eq!(cache.purge_expired().await.unwrap(), 1);
    assert_eq!(cache.purge_expired().await.unwrap(), 0);

    // The rewritten file holds only the surviving entry
    let content = std::fs::read_to_string(temp_dir.path().join(ENTRIES_FILE)).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[tokio::test]
async fn test_open_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig::with_cache_root(temp_dir.path().join("nested"));

    let cache = ResultCache::open(&config, start_clock()).await.unwrap();
    assert_eq!(cache.ttl(), chrono::Duration::hours(5));
    assert!(temp_dir.path().join("nested").exists());
}
