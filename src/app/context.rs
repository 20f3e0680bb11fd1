//! Shared collaborators handed to every provider

use std::sync::Arc;

use crate::app::cache::ResultCache;
use crate::app::client::ImageSource;
use crate::app::currency::CurrencyRateService;

/// Explicit context built once at startup
#[derive(Debug, Clone)]
pub struct AppContext {
    pub cache: ResultCache,
    /// Fingerprints and materializes client images
    pub images: Arc<dyn ImageSource>,
    pub rates: Arc<CurrencyRateService>,
}

impl AppContext {
    pub fn new(cache: ResultCache, images: Arc<dyn ImageSource>, rates: Arc<CurrencyRateService>) -> Self {
        Self {
            cache,
            images,
            rates,
        }
    }
}
