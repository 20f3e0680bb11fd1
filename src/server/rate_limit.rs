//! Per-identity request throttling
//!
//! Both the upgrade handshake and every inbound message consume one point
//! from a fixed window keyed by the remote IP address. The window opens on
//! the first request from an address and admits `points` requests until it
//! closes `window` later; the next request after that opens a fresh window.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::errors::{ConfigError, ConfigResult};

/// Points consumed by one address in its current window
#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    consumed: u32,
}

impl Window {
    fn is_expired(&self, now: Instant, length: Duration) -> bool {
        now.saturating_duration_since(self.opened_at) >= length
    }
}

/// Fixed-window limiter keyed by remote address
#[derive(Debug)]
pub struct IdentityLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    points: u32,
    window: Duration,
}

impl IdentityLimiter {
    /// Allow `points` requests per `window` for each remote address
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `points` or `window` is zero.
    pub fn new(points: u32, window: Duration) -> ConfigResult<Self> {
        if points == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.points".to_string(),
                value: points.to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.window".to_string(),
                value: format!("{:?}", window),
                reason: "Must be longer than zero".to_string(),
            });
        }

        Ok(Self {
            windows: Mutex::new(HashMap::new()),
            points,
            window,
        })
    }

    /// Consume one point for `ip`; false if its window is used up
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.lock();
        let current = windows.entry(ip).or_insert(Window {
            opened_at: now,
            consumed: 0,
        });

        if current.is_expired(now, self.window) {
            *current = Window {
                opened_at: now,
                consumed: 0,
            };
        }

        if current.consumed < self.points {
            current.consumed += 1;
            true
        } else {
            false
        }
    }

    /// Forget addresses whose window has closed
    pub fn prune(&self) {
        let now = Instant::now();
        let mut windows = self.lock();
        windows.retain(|_, current| !current.is_expired(now, self.window));
        windows.shrink_to_fit();
        debug!("Rate limiter tracking {} addresses", windows.len());
    }

    /// Number of addresses currently tracked
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
