//! Where exchange rates come from

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::app::client::HttpHandler;
use crate::constants::currency;
use crate::errors::{FetchError, RateError, RateResult};

/// Supplies the current factor for a currency pair
#[async_trait]
pub trait RateSource: Send + Sync + Debug {
    async fn fetch_rate(&self, from: &str, to: &str) -> RateResult<f64>;
}

/// Reads the rate from a web search results page
#[derive(Debug, Clone)]
pub struct GoogleRateSource {
    http: Arc<HttpHandler>,
    search_url: Url,
}

impl GoogleRateSource {
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` if `search_url` does not parse
    pub fn new(http: Arc<HttpHandler>, search_url: &str) -> Result<Self, FetchError> {
        let search_url = Url::parse(search_url).map_err(|e| FetchError::InvalidUrl {
            url: search_url.to_string(),
            error: e.to_string(),
        })?;
        Ok(Self { http, search_url })
    }

    fn query_url(&self, from: &str, to: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("1 {} to {}", from, to));
        url
    }
}

#[async_trait]
impl RateSource for GoogleRateSource {
    async fn fetch_rate(&self, from: &str, to: &str) -> RateResult<f64> {
        let url = self.query_url(from, to);
        debug!("Requesting exchange rate page {}", url);

        let response = self
            .http
            .send_with_retry(|client| {
                client
                    .get(url.as_str())
                    .header(COOKIE, currency::CONSENT_COOKIE)
            })
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::ServerError {
                status: response.status().as_u16(),
            }
            .into());
        }

        let body = response.text().await?;
        parse_rate_page(&body)
    }
}

/// Extract the factor from the first `span[data-value]` on a results page
pub fn parse_rate_page(html: &str) -> RateResult<f64> {
    let not_found = || RateError::ElementNotFound {
        selector: currency::RATE_SELECTOR.to_string(),
    };
    let selector = Selector::parse(currency::RATE_SELECTOR).map_err(|_| not_found())?;

    let document = Html::parse_document(html);
    let value = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("data-value"))
        .ok_or_else(not_found)?;

    validate_rate(value.trim())
}

fn validate_rate(value: &str) -> RateResult<f64> {
    match value.parse::<f64>() {
        Ok(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        _ => Err(RateError::InvalidRate {
            value: value.to_string(),
        }),
    }
}

/// Constant factor, for offline operation and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedRateSource {
    rate: f64,
}

impl FixedRateSource {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateSource for FixedRateSource {
    async fn fetch_rate(&self, _from: &str, _to: &str) -> RateResult<f64> {
        if self.rate.is_finite() && self.rate > 0.0 {
            Ok(self.rate)
        } else {
            Err(RateError::InvalidRate {
                value: self.rate.to_string(),
            })
        }
    }
}
