//! HTTP client configuration and building logic
//!
//! One `reqwest::Client` is shared by image fingerprinting, provider page
//! requests and the exchange rate scraper.

use std::time::Duration;

use reqwest::Client;

use crate::constants::{http, limits};
use crate::errors::{FetchError, FetchResult};

/// Configuration for the outbound HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of idle connections per host
    pub pool_max_per_host: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// User agent presented to provider sites
    pub user_agent: String,
    /// Outbound rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Largest image body accepted
    pub max_image_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            user_agent: http::USER_AGENT.to_string(),
            rate_limit_rps: limits::DEFAULT_OUTBOUND_RPS,
            max_image_bytes: http::MAX_IMAGE_BYTES,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    ///
    /// The cookie store stays enabled: provider sites hand out session
    /// cookies on the landing page that later upload requests must carry.
    pub fn build_http_client(&self) -> FetchResult<Client> {
        let mut client_builder = Client::builder()
            .cookie_store(true)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(FetchError::Http)
    }
}
