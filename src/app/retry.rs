//! Unbounded retry for transient bootstrap failures
//!
//! Provider sessions and the exchange-rate refresher both acquire external
//! resources that may be unavailable for a while. They retry forever with a
//! delay taken from a [`Backoff`] policy, logging every failure and never
//! surfacing it to callers.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use tracing::{error, info};

/// Fixed-delay policy used by provider bootstrap and rate refresh
pub fn fixed_delay(delay: Duration) -> Constant {
    Constant::new(delay)
}

/// Run `operation` until it succeeds, sleeping between attempts
///
/// The policy supplies the delay before each new attempt; if it ever runs
/// out, `fallback_delay` is used so the loop keeps its unbounded semantics.
///
/// # Arguments
///
/// * `label` - Name used in log lines
/// * `policy` - Delay policy between attempts
/// * `fallback_delay` - Delay used once the policy is exhausted
/// * `operation` - Fallible async operation, re-invoked on each attempt
pub async fn retry_forever<T, E, F, Fut, B>(
    label: &str,
    mut policy: B,
    fallback_delay: Duration,
    mut operation: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    B: Backoff,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} succeeded after {} attempts", label, attempt);
                }
                return value;
            }
            Err(e) => {
                let delay = policy.next_backoff().unwrap_or(fallback_delay);
                error!("{} failed (attempt {}): {}", label, attempt, e);
                info!("{}: retrying in {:?}...", label, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
