//! Provider pipeline
//!
//! A `Provider` wraps one scraping backend with a single-flight task queue
//! and the result cache. Searches that hit the cache are answered without
//! touching the queue; misses are queued and executed one at a time, with
//! the cache checked again once their turn comes.
//!
//! Lifecycle: `Unloaded -> Loading -> Loaded`. Bootstrap retries forever
//! with a fixed delay, and searches run before it finishes simply yield no
//! products.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app::context::AppContext;
use crate::app::models::Product;
use crate::app::queue::{TaskHandle, TaskQueue};
use crate::app::retry::{fixed_delay, retry_forever};
use crate::app::transaction::Transaction;
use crate::constants::status;
use crate::errors::{ProviderError, ProviderResult};
use crate::server::protocol::ServerMessage;

use super::backend::ProviderBackend;

/// Bootstrap state of a provider's automation resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Unloaded,
    Loading,
    Loaded,
}

/// How a queued search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Products were sent to the client (if still connected)
    Delivered { products: usize, from_cache: bool },
    /// Provider not loaded or nothing found; failure status sent
    NoResults,
    /// An error was caught; failure status sent
    Failed,
}

#[derive(Debug)]
pub struct Provider {
    name: String,
    /// Exclusively owned; only driven from bootstrap and queued tasks
    backend: tokio::sync::Mutex<Box<dyn ProviderBackend>>,
    state: RwLock<ProviderState>,
    queue: TaskQueue,
    /// Transactions waiting in the queue, in submission order
    pending: Mutex<Vec<Arc<Transaction>>>,
    context: Arc<AppContext>,
    retry_delay: Duration,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        backend: Box<dyn ProviderBackend>,
        context: Arc<AppContext>,
        retry_delay: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            queue: TaskQueue::new(name.clone()),
            name,
            backend: tokio::sync::Mutex::new(backend),
            state: RwLock::new(ProviderState::Unloaded),
            pending: Mutex::new(Vec::new()),
            context,
            retry_delay,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProviderState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == ProviderState::Loaded
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Number of transactions waiting for their turn
    pub fn pending_count(&self) -> usize {
        self.pending_lock().len()
    }

    /// Load the automation resource, retrying until it succeeds
    ///
    /// Returns immediately if the provider is already loaded or loading.
    pub async fn bootstrap(&self) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if *state != ProviderState::Unloaded {
                return;
            }
            *state = ProviderState::Loading;
        }

        info!("[{}] Loading...", self.name);
        let label = format!("[{}] bootstrap", self.name);
        retry_forever(
            &label,
            fixed_delay(self.retry_delay),
            self.retry_delay,
            move || async move { self.backend.lock().await.load_resource().await },
        )
        .await;

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = ProviderState::Loaded;
        info!("[{}] Loaded", self.name);
    }

    /// Answer from the cache or queue the search
    ///
    /// Fingerprints the transaction's image and looks the result up. On a
    /// hit the cached products are sent straight away and `None` is
    /// returned; on a miss the transaction is queued and the handle to its
    /// task returned.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the image cannot be fingerprinted or the
    /// cache lookup fails. Nothing is queued in that case.
    pub async fn enqueue(
        self: &Arc<Self>,
        transaction: Arc<Transaction>,
    ) -> ProviderResult<Option<TaskHandle<TaskOutcome>>> {
        debug!(
            provider = %self.name,
            transaction = transaction.id(),
            "Enqueuing search"
        );

        let image_url = transaction
            .image_url()
            .ok_or(ProviderError::MissingImage {
                transaction_id: transaction.id(),
            })?;
        let hash = self.context.images.fingerprint(&image_url).await?;
        transaction.set_content_hash(hash);

        if let Some(entry) = self.context.cache.lookup(&self.name, &hash).await? {
            if transaction.is_open() {
                info!("[{}] Sending cached products data...", self.name);
                transaction.send(&ServerMessage::search(entry.products));
            }
            return Ok(None);
        }

        self.pending_lock().push(Arc::clone(&transaction));
        let provider = Arc::clone(self);
        let handle = self
            .queue
            .enqueue(move || async move { provider.task(transaction).await });
        Ok(Some(handle))
    }

    /// Search the backend if the provider is loaded
    ///
    /// Returns `None` while the provider is still bootstrapping; callers
    /// treat that exactly like an empty result. Converted prices are filled
    /// in from the currency service.
    pub async fn run(&self, transaction: &Transaction) -> ProviderResult<Option<Vec<Product>>> {
        if !self.is_loaded() {
            debug!("[{}] Not loaded yet, no products", self.name);
            return Ok(None);
        }

        let mut products = {
            let mut backend = self.backend.lock().await;
            backend.fetch_results(transaction, &self.context).await?
        };

        transaction.send(&ServerMessage::status(format!(
            "Found {} products. Converting currency...",
            products.len()
        )));
        for product in &mut products {
            product.currency.brazilian = product
                .currency
                .chinese
                .as_deref()
                .and_then(|price| self.context.rates.convert_price(price));
        }

        Ok(Some(products))
    }

    /// Queued body of a search; never fails
    ///
    /// Any error is logged and turned into a failure status for the client.
    pub async fn task(&self, transaction: Arc<Transaction>) -> TaskOutcome {
        self.remove_pending(&transaction);

        match self.execute(&transaction).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    provider = %self.name,
                    transaction = transaction.id(),
                    "Search failed: {}",
                    e
                );
                transaction.send(&ServerMessage::failure());
                TaskOutcome::Failed
            }
        }
    }

    async fn execute(&self, transaction: &Transaction) -> ProviderResult<TaskOutcome> {
        let hash = transaction
            .content_hash()
            .ok_or(ProviderError::MissingHash {
                transaction_id: transaction.id(),
            })?;

        // Another queued search for the same image may have filled the cache
        let cached = self.context.cache.lookup(&self.name, &hash).await?;

        info!("[{}] Retrieving products...", self.name);
        transaction.send(&ServerMessage::status(status::RETRIEVING));

        if let Some(entry) = cached {
            let count = entry.products.len();
            if transaction.is_open() {
                transaction.send(&ServerMessage::search(entry.products));
            }
            return Ok(TaskOutcome::Delivered {
                products: count,
                from_cache: true,
            });
        }

        match self.run(transaction).await? {
            Some(products) if !products.is_empty() => {
                let count = products.len();
                self.context
                    .cache
                    .store(&self.name, &hash, products.clone())
                    .await?;

                if transaction.is_open() {
                    info!("[{}] Sending products data...", self.name);
                    transaction.send(&ServerMessage::search(products));
                }
                self.notify_pending();

                Ok(TaskOutcome::Delivered {
                    products: count,
                    from_cache: false,
                })
            }
            _ => {
                warn!(
                    "[{}] No products retrieved for transaction {}",
                    self.name,
                    transaction.id()
                );
                transaction.send(&ServerMessage::failure());
                Ok(TaskOutcome::NoResults)
            }
        }
    }

    /// Tell every waiting client how many searches are queued ahead of it
    fn notify_pending(&self) {
        let pending = self.pending_lock().clone();
        for (ahead, transaction) in pending.iter().enumerate() {
            transaction.send(&ServerMessage::queue_position(ahead));
        }
    }

    fn remove_pending(&self, transaction: &Arc<Transaction>) {
        self.pending_lock()
            .retain(|queued| !Arc::ptr_eq(queued, transaction));
    }

    fn pending_lock(&self) -> MutexGuard<'_, Vec<Arc<Transaction>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
