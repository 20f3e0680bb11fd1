//! Outbound HTTP for image materialization and fingerprinting
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with resilience patterns
//!
//! [`ImageClient`] is the production [`ImageSource`]: it streams a client
//! supplied image URL, hashing it chunk by chunk for the cache key, or
//! collecting it for upload to a provider.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Response;
use url::Url;

use crate::app::hash::{ContentHash, ContentHasher};
use crate::errors::{FetchError, FetchResult};

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::HttpHandler;

/// Materializes and fingerprints remote images
#[async_trait]
pub trait ImageSource: Send + Sync + Debug {
    /// MD5 of the image body at `url`
    async fn fingerprint(&self, url: &str) -> FetchResult<ContentHash>;

    /// Full image body at `url`
    async fn fetch(&self, url: &str) -> FetchResult<Bytes>;
}

/// `ImageSource` backed by the shared HTTP handler
#[derive(Debug, Clone)]
pub struct ImageClient {
    http: Arc<HttpHandler>,
    max_image_bytes: usize,
}

impl ImageClient {
    pub fn new(http: Arc<HttpHandler>, max_image_bytes: usize) -> Self {
        Self {
            http,
            max_image_bytes,
        }
    }

    /// Build the HTTP stack from `config` and wrap it
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the client or its limiter cannot be built
    pub fn from_config(config: &ClientConfig) -> FetchResult<Self> {
        let client = config.build_http_client()?;
        let http = HttpHandler::new(client, config.rate_limit_rps)?;
        Ok(Self::new(Arc::new(http), config.max_image_bytes))
    }

    /// Shared HTTP handler, for collaborators that issue their own requests
    pub fn http(&self) -> Arc<HttpHandler> {
        Arc::clone(&self.http)
    }

    async fn open(&self, url: &str) -> FetchResult<Response> {
        let parsed = parse_image_url(url)?;
        let response = self.http.get_response(&parsed).await?;
        if !response.status().is_success() {
            return Err(FetchError::ServerError {
                status: response.status().as_u16(),
            });
        }
        if let Some(length) = response.content_length() {
            if length > self.max_image_bytes as u64 {
                return Err(FetchError::TooLarge {
                    limit: self.max_image_bytes,
                });
            }
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageSource for ImageClient {
    async fn fingerprint(&self, url: &str) -> FetchResult<ContentHash> {
        let mut stream = self.open(url).await?.bytes_stream();
        let mut hasher = ContentHasher::new();

        while let Some(chunk) = stream.next().await {
            hasher.update(&chunk?);
            if hasher.consumed() > self.max_image_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_image_bytes,
                });
            }
        }

        let hash = hasher.finish();
        tracing::debug!("Fingerprinted {} as {}", url, hash);
        Ok(hash)
    }

    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        let mut stream = self.open(url).await?.bytes_stream();
        let mut body = Vec::new();

        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
            if body.len() > self.max_image_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_image_bytes,
                });
            }
        }

        Ok(Bytes::from(body))
    }
}

/// Accept only absolute http(s) URLs from clients
pub fn parse_image_url(url: &str) -> FetchResult<Url> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            error: format!("unsupported scheme '{}'", other),
        }),
    }
}
