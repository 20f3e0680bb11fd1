//! Scraping seam of a provider
//!
//! Each provider exclusively owns one boxed backend. The provider's task
//! queue guarantees the backend is never driven by two operations at once,
//! so implementations may keep navigation state in `&mut self`.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::app::context::AppContext;
use crate::app::models::Product;
use crate::app::transaction::Transaction;
use crate::errors::ProviderResult;

#[async_trait]
pub trait ProviderBackend: Send + Sync + Debug {
    /// Acquire the automation resource and bring it to a ready state
    async fn load_resource(&mut self) -> ProviderResult<()>;

    /// Search the site for the transaction's image
    ///
    /// An empty list means the site found nothing. Backends may send
    /// progress statuses through the transaction.
    async fn fetch_results(
        &mut self,
        transaction: &Transaction,
        context: &AppContext,
    ) -> ProviderResult<Vec<Product>>;
}
