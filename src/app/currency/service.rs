//! Periodically refreshed exchange rate
//!
//! The service holds one mutable rate shared by every provider. It is
//! refreshed at startup and then on a fixed timer; a failed refresh is
//! retried with a fixed delay until it succeeds and is never reported to
//! readers. Reads never block on a refresh.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::app::clock::Clock;
use crate::app::retry::{fixed_delay, retry_forever};
use crate::errors::RateResult;

use super::config::CurrencyConfig;
use super::rate::Rate;
use super::source::RateSource;

#[derive(Debug)]
pub struct CurrencyRateService {
    source: Arc<dyn RateSource>,
    rate: RwLock<Rate>,
    config: CurrencyConfig,
    clock: Arc<dyn Clock>,
}

impl CurrencyRateService {
    pub fn new(source: Arc<dyn RateSource>, config: CurrencyConfig, clock: Arc<dyn Clock>) -> Self {
        let rate = Rate::unset(config.from.clone(), config.to.clone());
        Self {
            source,
            rate: RwLock::new(rate),
            config,
            clock,
        }
    }

    /// Fetch the factor once and publish it
    pub async fn refresh(&self) -> RateResult<f64> {
        let factor = self
            .source
            .fetch_rate(&self.config.from, &self.config.to)
            .await?;

        let mut rate = self.rate.write().unwrap_or_else(PoisonError::into_inner);
        rate.rate = Some(factor);
        rate.last_updated = Some(self.clock.now());
        info!(
            "[currency] Current rate for {} to {} is {}",
            rate.from, rate.to, factor
        );
        Ok(factor)
    }

    /// Refresh, retrying with the configured delay until it succeeds
    pub async fn refresh_until_success(&self) -> f64 {
        retry_forever(
            "currency rate refresh",
            fixed_delay(self.config.retry_delay),
            self.config.retry_delay,
            move || self.refresh(),
        )
        .await
    }

    /// Refresh now and then on every interval until shutdown
    pub fn spawn_refresher(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("[currency] Refreshing exchange rate...");
                        tokio::select! {
                            _ = self.refresh_until_success() => {}
                            _ = shutdown.recv() => break,
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            debug!("[currency] Refresher stopped");
        })
    }

    /// Current rate tuple
    pub fn snapshot(&self) -> Rate {
        self.rate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Convert `amount` with the latest factor, formatted with two decimals
    ///
    /// Returns `None` until a factor is established or if the product is not
    /// a finite number.
    pub fn convert(&self, amount: f64) -> Option<String> {
        let factor = self.snapshot().rate?;
        let converted = amount * factor;
        converted.is_finite().then(|| format!("{:.2}", converted))
    }

    /// Convert a scraped price string such as `"1,234.50"`
    pub fn convert_price(&self, price: &str) -> Option<String> {
        let amount = parse_price(price)?;
        self.convert(amount)
    }
}

/// Parse a price string, ignoring thousands separators
pub fn parse_price(price: &str) -> Option<f64> {
    let cleaned: String = price.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}
