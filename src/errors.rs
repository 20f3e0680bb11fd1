//! Error types for Source Finder
//!
//! This module defines the error types for every component of the gateway.
//! Each concern gets its own enum and result alias; `AppError` wraps them all
//! for the binary and the CLI handlers.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fetching or fingerprinting remote images
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL provided by a client
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned a non-success status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded on the remote side
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Remote server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Image larger than the configured limit
    #[error("Image exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    /// Client settings cannot be applied
    #[error("Invalid HTTP client configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Result cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory not found or inaccessible
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// I/O error on the backing file
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be encoded or decoded
    #[error("Cache entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TTL cannot be represented as a calendar duration
    #[error("Invalid cache TTL: {reason}")]
    InvalidTtl { reason: String },
}

/// Task queue errors, delivered only to the future of the affected action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The action panicked while executing
    #[error("Action panicked in queue '{queue}'")]
    ActionPanicked { queue: String },

    /// The action was dropped before it could report a result
    #[error("Action in queue '{queue}' was dropped before settling")]
    Dropped { queue: String },
}

/// Provider pipeline errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Image fetch or fingerprint failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache lookup or write failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Transaction reached the provider without an image reference
    #[error("Transaction {transaction_id} has no image reference")]
    MissingImage { transaction_id: u64 },

    /// Transaction reached the task without a content hash
    #[error("Transaction {transaction_id} has no content hash")]
    MissingHash { transaction_id: u64 },

    /// Page request issued by the backend failed
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider page answered with an unexpected status
    #[error("Provider page returned HTTP {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Expected element not found on a provider page
    #[error("Expected element not found: {selector}")]
    ElementNotFound { selector: String },

    /// CSS selector in a site profile does not parse
    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    /// No built-in or fully configured site profile for a provider name
    #[error("No site profile for provider '{name}'")]
    UnknownProfile { name: String },

    /// Provider queue reported a failure
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Exchange rate errors
#[derive(Error, Debug)]
pub enum RateError {
    /// HTTP request failed
    #[error("Exchange rate request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate page could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Expected element not found on the rate page
    #[error("Exchange rate element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Rate value is not a positive finite number
    #[error("Invalid exchange rate value: {value}")]
    InvalidRate { value: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("Configuration could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// Listener and session errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Listener could not bind
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed
    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// Request refused before any response; the connection is reset
    #[error("Connection from {remote} rejected: {reason}")]
    Rejected { remote: SocketAddr, reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Image fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Provider error
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Exchange rate error
    #[error(transparent)]
    Rate(#[from] RateError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Server error
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Short label for the failing component, used in the fatal error line
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Cache(_) => "cache",
            AppError::Queue(_) => "queue",
            AppError::Provider(_) => "provider",
            AppError::Rate(_) => "currency",
            AppError::Config(_) => "config",
            AppError::Server(_) => "server",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Queue result type alias
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Provider result type alias
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Exchange rate result type alias
pub type RateResult<T> = std::result::Result<T, RateError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Server result type alias
pub type ServerResult<T> = std::result::Result<T, ServerError>;
