//! Exchange rate configuration

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::client::HttpHandler;
use crate::constants::currency;
use crate::errors::RateError;

use super::source::{FixedRateSource, GoogleRateSource, RateSource};

/// Which [`RateSource`] backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSourceKind {
    #[default]
    Google,
    Fixed,
}

/// Configuration for the currency rate service
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    /// Currency provider prices are quoted in
    pub from: String,
    /// Currency shown to clients
    pub to: String,
    pub refresh_interval: Duration,
    /// Delay between failed refresh attempts
    pub retry_delay: Duration,
    pub source: RateSourceKind,
    /// Factor used by the fixed source
    pub fixed_rate: Option<f64>,
    /// Search page scraped by the google source
    pub search_url: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            from: currency::DEFAULT_FROM.to_string(),
            to: currency::DEFAULT_TO.to_string(),
            refresh_interval: currency::REFRESH_INTERVAL,
            retry_delay: currency::RETRY_DELAY,
            source: RateSourceKind::Google,
            fixed_rate: None,
            search_url: currency::GOOGLE_SEARCH_URL.to_string(),
        }
    }
}

impl CurrencyConfig {
    /// Build the configured rate source
    ///
    /// # Errors
    ///
    /// Returns `RateError::InvalidRate` if the fixed source has no rate and
    /// `RateError::Fetch` if the search URL is malformed.
    pub fn build_source(&self, http: Arc<HttpHandler>) -> Result<Arc<dyn RateSource>, RateError> {
        match self.source {
            RateSourceKind::Google => Ok(Arc::new(GoogleRateSource::new(http, &self.search_url)?)),
            RateSourceKind::Fixed => {
                let rate = self.fixed_rate.ok_or_else(|| RateError::InvalidRate {
                    value: "missing fixed_rate".to_string(),
                })?;
                Ok(Arc::new(FixedRateSource::new(rate)))
            }
        }
    }
}
