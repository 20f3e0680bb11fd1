//! Tests for the provider pipeline
//!
//! The backend and image source are scripted fakes; time is either a manual
//! clock (cache expiry) or paused Tokio time (queue timing and bootstrap).

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::app::cache::{CacheStore, MemoryStore, ResultCache};
use crate::app::client::ImageSource;
use crate::app::clock::{Clock, ManualClock};
use crate::app::context::AppContext;
use crate::app::currency::{CurrencyConfig, CurrencyRateService, FixedRateSource};
use crate::app::hash::ContentHash;
use crate::app::models::Product;
use crate::app::provider::{Provider, ProviderBackend, ProviderState, TaskOutcome};
use crate::app::transaction::Transaction;
use crate::constants::cache::ENTRY_TTL;
use crate::errors::{FetchResult, ProviderError, ProviderResult};
use crate::server::connection::{ConnectionHandle, Outbound};

/// Image source hashing the URL text itself
#[derive(Debug, Default)]
struct UrlImages;

#[async_trait]
impl ImageSource for UrlImages {
    async fn fingerprint(&self, url: &str) -> FetchResult<ContentHash> {
        Ok(ContentHash::digest(url.as_bytes()))
    }

    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        Ok(Bytes::copy_from_slice(url.as_bytes()))
    }
}

/// Observable state of a scripted backend
#[derive(Debug, Default)]
struct Script {
    load_failures: AtomicU32,
    loads: AtomicU32,
    fetches: AtomicU32,
    /// Results handed out in order; an empty script yields no products
    results: Mutex<VecDeque<ProviderResult<Vec<Product>>>>,
    delay: Mutex<Duration>,
    /// (start, end) of every fetch
    spans: Mutex<Vec<(Instant, Instant)>>,
}

#[derive(Debug)]
struct ScriptedBackend {
    script: Arc<Script>,
}

#[async_trait]
impl ProviderBackend for ScriptedBackend {
    async fn load_resource(&mut self) -> ProviderResult<()> {
        self.script.loads.fetch_add(1, Ordering::SeqCst);
        let left = self.script.load_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.script.load_failures.store(left - 1, Ordering::SeqCst);
            return Err(ProviderError::ElementNotFound {
                selector: "input[type=file]".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_results(
        &mut self,
        _transaction: &Transaction,
        _context: &AppContext,
    ) -> ProviderResult<Vec<Product>> {
        self.script.fetches.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let delay = *self.script.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.script
            .spans
            .lock()
            .unwrap()
            .push((started, Instant::now()));
        self.script
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

struct Harness {
    provider: Arc<Provider>,
    script: Arc<Script>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    context: Arc<AppContext>,
}

async fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryStore::new());
    let cache = ResultCache::new(store.clone(), clock.clone(), ENTRY_TTL).unwrap();
    let rates = Arc::new(CurrencyRateService::new(
        Arc::new(FixedRateSource::new(0.7)),
        CurrencyConfig::default(),
        clock.clone(),
    ));
    rates.refresh().await.unwrap();

    let context = Arc::new(AppContext::new(cache, Arc::new(UrlImages), rates));
    let script = Arc::new(Script::default());
    let provider = Arc::new(Provider::new(
        "1688",
        Box::new(ScriptedBackend {
            script: Arc::clone(&script),
        }),
        Arc::clone(&context),
        Duration::from_secs(10),
    ));

    Harness {
        provider,
        script,
        store,
        clock,
        context,
    }
}

fn client(id: u64) -> (Arc<ConnectionHandle>, mpsc::UnboundedReceiver<Outbound>) {
    let remote: SocketAddr = format!("127.0.0.1:{}", 40000 + id).parse().unwrap();
    ConnectionHandle::new(id, remote)
}

fn transaction(conn: &Arc<ConnectionHandle>, image_url: &str) -> Arc<Transaction> {
    let tx = Transaction::new(Arc::clone(conn));
    tx.set_image_url(image_url);
    tx.set_provider("1688");
    Arc::new(tx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(Outbound::Text(text)) = rx.try_recv() {
        frames.push(serde_json::from_str(&text).unwrap());
    }
    frames
}

fn product(price: &str) -> Product {
    Product::new(
        "Linen shirt",
        "https://cbu01.example/a.jpg",
        "https://detail.1688.com/offer/1.html",
        Some(price.to_string()),
    )
}

#[tokio::test]
async fn test_cache_hit_answers_without_queueing() {
    // Test that an unexpired entry is delivered directly from enqueue
    let h = harness().await;
    let hash = ContentHash::digest(b"http://x/y.jpg");
    h.context
        .cache
        .store("1688", &hash, vec![product("10.00")])
        .await
        .unwrap();

    let (conn, mut rx) = client(1);
    let handle = h
        .provider
        .enqueue(transaction(&conn, "http://x/y.jpg"))
        .await
        .unwrap();

    assert!(handle.is_none());
    assert_eq!(h.provider.queue().stats().total_enqueued, 0);
    assert_eq!(h.script.fetches.load(Ordering::SeqCst), 0);

    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["query"], "search");
    assert_eq!(frames[0]["data"][0]["name"], "Linen shirt");
}

#[tokio::test]
async fn test_expired_entry_is_a_miss() {
    let h = harness().await;
    let hash = ContentHash::digest(b"http://x/y.jpg");
    h.context.cache.store("1688", &hash, vec![product("10.00")]).await.unwrap();
    h.clock.advance(chrono::Duration::hours(6));

    let (conn, _rx) = client(1);
    let handle = h.provider.enqueue(transaction(&conn, "http://x/y.jpg")).await.unwrap();

    assert!(handle.is_some());
    assert_eq!(handle.unwrap().await.unwrap(), TaskOutcome::NoResults);
}

#[tokio::test]
async fn test_miss_writes_one_entry_and_converts_prices() {
    // Scenario: 1688 search, no cache entry, one product at 10.00, CNY->BRL 0.7
    let h = harness().await;
    h.provider.bootstrap().await;
    h.script
        .results
        .lock()
        .unwrap()
        .push_back(Ok(vec![product("10.00")]));

    let (conn, mut rx) = client(1);
    let outcome = h
        .provider
        .enqueue(transaction(&conn, "http://x/y.jpg"))
        .await
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TaskOutcome::Delivered {
            products: 1,
            from_cache: false
        }
    );

    let stats = h.store.stats(h.clock.now()).await.unwrap();
    assert_eq!(stats.total_entries, 1);
    let entry = h
        .context
        .cache
        .lookup("1688", &ContentHash::digest(b"http://x/y.jpg"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.created_at, h.clock.now());
    assert_eq!(entry.expire_at, h.clock.now() + chrono::Duration::hours(5));
    assert_eq!(entry.products[0].currency.brazilian.as_deref(), Some("7.00"));

    let frames = drain(&mut rx);
    assert_eq!(frames[0]["data"], "Retrieving products...");
    assert_eq!(frames[1]["data"], "Found 1 products. Converting currency...");
    let result = frames.last().unwrap();
    assert_eq!(result["query"], "search");
    assert_eq!(result["data"][0]["currency"]["chinese"], "10.00");
    assert_eq!(result["data"][0]["currency"]["brazilian"], "7.00");
}

#[tokio::test]
async fn test_empty_result_writes_nothing_and_reports_failure() {
    let h = harness().await;
    h.provider.bootstrap().await;
    h.script.results.lock().unwrap().push_back(Ok(Vec::new()));

    let (conn, mut rx) = client(1);
    let outcome = h
        .provider
        .enqueue(transaction(&conn, "http://x/y.jpg"))
        .await
        .unwrap()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome, TaskOutcome::NoResults);
    assert!(h.store.is_empty().await);

    let frames = drain(&mut rx);
    let last = frames.last().unwrap();
    assert_eq!(last["query"], "status");
    assert_eq!(last["data"], "An error occurred.");
}

#[tokio::test]
async fn test_unloaded_provider_yields_no_products() {
    let h = harness().await;
    assert_eq!(h.provider.state(), ProviderState::Unloaded);

    let (conn, _rx) = client(1);
    let tx = transaction(&conn, "http://x/y.jpg");
    assert!(h.provider.run(&tx).await.unwrap().is_none());
    assert_eq!(h.script.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_backend_error_is_contained() {
    // Test that a failing search reports failure and the queue keeps going
    let h = harness().await;
    h.provider.bootstrap().await;
    {
        let mut results = h.script.results.lock().unwrap();
        results.push_back(Err(ProviderError::ElementNotFound {
            selector: ".space-offer-card-box".to_string(),
        }));
        results.push_back(Ok(vec![product("3.00")]));
    }

    let (conn, mut rx) = client(1);
    let first = h.provider.enqueue(transaction(&conn, "http://x/a.jpg")).await.unwrap().unwrap();
    let second = h.provider.enqueue(transaction(&conn, "http://x/b.jpg")).await.unwrap().unwrap();

    assert_eq!(first.await.unwrap(), TaskOutcome::Failed);
    assert_eq!(
        second.await.unwrap(),
        TaskOutcome::Delivered {
            products: 1,
            from_cache: false
        }
    );

    let frames = drain(&mut rx);
    assert!(frames
        .iter()
        .any(|f| f["query"] == "status" && f["data"] == "An error occurred."));
}

#[tokio::test]
async fn test_closed_connection_does_not_abort_task() {
    let h = harness().await;
    h.provider.bootstrap().await;
    h.script
        .results
        .lock()
        .unwrap()
        .push_back(Ok(vec![product("10.00")]));

    let (conn, rx) = client(1);
    let tx = transaction(&conn, "http://x/y.jpg");
    let handle = h.provider.enqueue(tx).await.unwrap().unwrap();
    conn.terminate();
    drop(rx);

    // The result is still cached for the next client
    assert!(matches!(handle.await.unwrap(), TaskOutcome::Delivered { .. }));
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_queued_searches_never_overlap() {
    // Test three concurrent searches against one provider run back to back
    let h = harness().await;
    h.provider.bootstrap().await;
    *h.script.delay.lock().unwrap() = Duration::from_secs(2);
    {
        let mut results = h.script.results.lock().unwrap();
        for price in ["1.00", "2.00", "3.00"] {
            results.push_back(Ok(vec![product(price)]));
        }
    }

    let mut handles = Vec::new();
    let mut receivers = Vec::new();
    for (i, url) in ["http://x/1.jpg", "http://x/2.jpg", "http://x/3.jpg"].iter().enumerate() {
        let (conn, rx) = client(i as u64);
        receivers.push(rx);
        handles.push(h.provider.enqueue(transaction(&conn, url)).await.unwrap().unwrap());
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let spans = h.script.spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 3);
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "fetches overlapped");
    }
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_queued_search_hits_cache_in_task() {
    let h = harness().await;
    h.provider.bootstrap().await;
    *h.script.delay.lock().unwrap() = Duration::from_secs(1);
    h.script
        .results
        .lock()
        .unwrap()
        .push_back(Ok(vec![product("10.00")]));

    let (first_conn, _first_rx) = client(1);
    let (second_conn, mut second_rx) = client(2);
    let first = h
        .provider
        .enqueue(transaction(&first_conn, "http://x/y.jpg"))
        .await
        .unwrap()
        .unwrap();
    let second = h
        .provider
        .enqueue(transaction(&second_conn, "http://x/y.jpg"))
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(first.await.unwrap(), TaskOutcome::Delivered { from_cache: false, .. }));
    assert_eq!(
        second.await.unwrap(),
        TaskOutcome::Delivered {
            products: 1,
            from_cache: true
        }
    );
    assert_eq!(h.script.fetches.load(Ordering::SeqCst), 1);

    // The waiting client heard its position, then got the cached result
    let frames = drain(&mut second_rx);
    assert_eq!(frames[0]["data"], "Queuing request: Your position is 0...");
    assert_eq!(frames.last().unwrap()["query"], "search");
}

fn positions(frames: &[Value]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|frame| frame["data"].as_str())
        .filter(|text| text.starts_with("Queuing request"))
        .map(str::to_string)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_waiting_positions_count_down() {
    let h = harness().await;
    h.provider.bootstrap().await;
    *h.script.delay.lock().unwrap() = Duration::from_secs(1);
    for price in ["10.00", "20.00", "30.00"] {
        h.script.results.lock().unwrap().push_back(Ok(vec![product(price)]));
    }

    let mut handles = Vec::new();
    let mut receivers = Vec::new();
    for (id, url) in [(1, "http://x/a.jpg"), (2, "http://x/b.jpg"), (3, "http://x/c.jpg")] {
        let (conn, rx) = client(id);
        let handle = h.provider.enqueue(transaction(&conn, url)).await.unwrap().unwrap();
        handles.push((conn, handle));
        receivers.push(rx);
    }
    for (_conn, handle) in handles {
        assert!(matches!(handle.await.unwrap(), TaskOutcome::Delivered { .. }));
    }

    let first = positions(&drain(&mut receivers[0]));
    let second = positions(&drain(&mut receivers[1]));
    let third = positions(&drain(&mut receivers[2]));

    assert!(first.is_empty());
    assert_eq!(second, vec!["Queuing request: Your position is 0..."]);
    assert_eq!(
        third,
        vec![
            "Queuing request: Your position is 1...",
            "Queuing request: Your position is 0...",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_retries_with_fixed_delay() {
    let h = harness().await;
    h.script.load_failures.store(2, Ordering::SeqCst);
    let started = Instant::now();

    h.provider.bootstrap().await;

    assert_eq!(h.provider.state(), ProviderState::Loaded);
    assert_eq!(h.script.loads.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_secs(20));
    assert!(started.elapsed() < Duration::from_secs(21));

    // Loaded is terminal
    h.provider.bootstrap().await;
    assert_eq!(h.script.loads.load(Ordering::SeqCst), 3);
}
