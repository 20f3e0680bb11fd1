//! Shared fakes for the integration tests
//!
//! Providers are backed by a canned backend and images are fingerprinted
//! from their URL, so no test touches the network except the local
//! listener.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

use source_finder::app::cache::{MemoryStore, ResultCache};
use source_finder::app::client::ImageSource;
use source_finder::app::clock::{Clock, SystemClock};
use source_finder::app::context::AppContext;
use source_finder::app::currency::{CurrencyConfig, CurrencyRateService, FixedRateSource};
use source_finder::app::hash::ContentHash;
use source_finder::app::models::Product;
use source_finder::app::provider::{Provider, ProviderBackend, ProviderRegistry};
use source_finder::app::transaction::Transaction;
use source_finder::constants::ENTRY_TTL;
use source_finder::errors::{FetchResult, ProviderResult};
use source_finder::server::{ConnectionManager, IdentityLimiter, Outbound};

/// Fingerprints an image by hashing its URL
#[derive(Debug, Default)]
pub struct UrlImages;

#[async_trait]
impl ImageSource for UrlImages {
    async fn fingerprint(&self, url: &str) -> FetchResult<ContentHash> {
        Ok(ContentHash::digest(url.as_bytes()))
    }

    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        Ok(Bytes::copy_from_slice(url.as_bytes()))
    }
}

/// Backend returning the same products for every search
#[derive(Debug)]
pub struct CannedBackend {
    pub products: Vec<Product>,
    pub fetches: Arc<AtomicU32>,
}

#[async_trait]
impl ProviderBackend for CannedBackend {
    async fn load_resource(&mut self) -> ProviderResult<()> {
        Ok(())
    }

    async fn fetch_results(
        &mut self,
        _transaction: &Transaction,
        _context: &AppContext,
    ) -> ProviderResult<Vec<Product>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.clone())
    }
}

pub fn product(price: &str) -> Product {
    Product::new(
        "Linen shirt",
        "https://cbu01.example/a.jpg",
        "https://detail.1688.com/offer/1.html",
        Some(price.to_string()),
    )
}

/// Context with an in-memory cache and a fixed CNY to BRL rate
pub async fn context(rate: f64) -> Arc<AppContext> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = ResultCache::new(Arc::new(MemoryStore::new()), Arc::clone(&clock), ENTRY_TTL).unwrap();
    let rates = Arc::new(CurrencyRateService::new(
        Arc::new(FixedRateSource::new(rate)),
        CurrencyConfig::default(),
        clock,
    ));
    rates.refresh().await.unwrap();
    Arc::new(AppContext::new(cache, Arc::new(UrlImages), rates))
}

/// Registry with one loaded provider named `name`
pub async fn registry(
    name: &str,
    products: Vec<Product>,
    context: Arc<AppContext>,
) -> (ProviderRegistry, Arc<AtomicU32>) {
    let fetches = Arc::new(AtomicU32::new(0));
    let backend = CannedBackend {
        products,
        fetches: Arc::clone(&fetches),
    };
    let mut registry = ProviderRegistry::new();
    let provider = registry.register(Provider::new(
        name,
        Box::new(backend),
        context,
        Duration::from_secs(10),
    ));
    provider.bootstrap().await;
    (registry, fetches)
}

pub fn manager(registry: ProviderRegistry, points: u32, window: Duration, heartbeat: Duration) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(
        registry,
        IdentityLimiter::new(points, window).unwrap(),
        IdentityLimiter::new(points, window).unwrap(),
        heartbeat,
    ))
}

pub fn remote(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Wait for the next text frame and parse it as JSON
pub async fn next_json(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection channel closed");
    match frame {
        Outbound::Text(text) => serde_json::from_str(&text).unwrap(),
        Outbound::Terminate => panic!("connection was terminated"),
    }
}

/// Collect frames until a search result arrives
pub async fn until_search(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> (Vec<Value>, Value) {
    let mut statuses = Vec::new();
    loop {
        let frame = next_json(rx).await;
        if frame["query"] == "search" {
            return (statuses, frame);
        }
        statuses.push(frame);
    }
}
