//! Core HTTP operations with rate limiting and retry logic
//!
//! Every outbound request passes the shared governor limiter first. GET
//! requests are retried on HTTP 429, HTTP 503 and transport errors with an
//! exponential delay.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Jitter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::constants::limits;
use crate::errors::{FetchError, FetchResult};

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use for requests
    /// * `rate_limit_rps` - Requests per second rate limit
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidConfig` if the rate is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> FetchResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> FetchResult<RateLimiter<NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            FetchError::InvalidConfig {
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Wait for an outbound request slot
    ///
    /// Callers that send non-replayable bodies (multipart uploads) take a
    /// slot here and then use [`HttpHandler::client`] directly.
    pub async fn acquire(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;
    }

    /// GET `url` with rate limiting and retry logic
    ///
    /// # Errors
    ///
    /// Returns `FetchError::RateLimitExceeded` or `ServerOverloaded` if the
    /// remote keeps answering 429/503, and `MaxRetriesExceeded` if the
    /// transport keeps failing.
    pub async fn get_response(&self, url: &Url) -> FetchResult<Response> {
        self.send_with_retry(|client| client.get(url.as_str())).await
    }

    /// Send a replayable request with rate limiting and retry logic
    ///
    /// `build` is invoked once per attempt.
    pub async fn send_with_retry<F>(&self, build: F) -> FetchResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.acquire().await;

        let mut retries = 0;
        loop {
            match build(&self.client).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
                        if retries < limits::MAX_RETRIES {
                            retries += 1;
                            let delay = Self::backoff_delay(retries);
                            tracing::warn!(
                                "Remote answered {}. Backing off for {}ms",
                                status.as_u16(),
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            FetchError::RateLimitExceeded
                        } else {
                            FetchError::ServerOverloaded
                        });
                    }

                    tracing::debug!("Fetched response from {}", response.url());
                    return Ok(response);
                }
                Err(e) if retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = Self::backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        limits::MAX_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        limits::MAX_RETRIES,
                        e
                    );
                    return Err(FetchError::MaxRetriesExceeded {
                        max_retries: limits::MAX_RETRIES,
                    });
                }
            }
        }
    }

    /// Fetch the body of a page as text
    ///
    /// # Errors
    ///
    /// Returns `FetchError::ServerError` for a non-success status
    pub async fn get_page(&self, url: &Url) -> FetchResult<String> {
        let response = self.get_response(url).await?;
        if !response.status().is_success() {
            return Err(FetchError::ServerError {
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn backoff_delay(retry: u32) -> Duration {
        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retry))
    }
}
