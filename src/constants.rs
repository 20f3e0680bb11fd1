//! Application constants for Source Finder
//!
//! This module centralizes the constants used throughout the gateway,
//! organized by functional domain.

use std::time::Duration;

/// Listener defaults
pub mod server {
    /// Default listening port
    pub const DEFAULT_PORT: u16 = 3000;

    /// Path of the read-only exchange rate endpoint
    pub const CURRENCY_RATE_PATH: &str = "/currency-rate";
}

/// Liveness checking
pub mod heartbeat {
    use super::Duration;

    /// Interval between heartbeat sweeps
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

    /// Probe sent to every live connection
    pub const PROBE: &str = "ping";

    /// Literal liveness reply expected from clients
    pub const REPLY: &str = "pong";
}

/// Abuse throttling
pub mod limits {
    use super::Duration;

    /// Requests allowed per remote identity within one window
    pub const DEFAULT_POINTS: u32 = 5;

    /// Rate limit window
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(2);

    /// Outbound image requests per second
    pub const DEFAULT_OUTBOUND_RPS: u32 = 15;

    /// Maximum retry attempts for failed image requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;

    /// Inbound payloads at least this long are truncated in log lines
    pub const LOG_TRUNCATE_CHARS: usize = 20;
}

/// HTTP client configuration
pub mod http {
    use super::Duration;

    /// Default user agent for outbound requests
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Largest image accepted for fingerprinting or upload (20MB)
    pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
}

/// Result cache
pub mod cache {
    use super::Duration;

    /// Lifetime of a cached search result
    pub const ENTRY_TTL: Duration = Duration::from_secs(5 * 60 * 60);

    /// Record kind written for provider search results
    pub const SOURCE_KIND: &str = "source";

    /// Append-only entries file inside the cache root
    pub const ENTRIES_FILE: &str = "entries.jsonl";

    /// Temporary file suffix for atomic rewrites
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

/// Provider sessions
pub mod providers {
    use super::Duration;

    /// Delay between bootstrap attempts
    pub const BOOTSTRAP_RETRY_DELAY: Duration = Duration::from_secs(10);

    /// Name of the 1688 provider
    pub const ALIBABA_1688: &str = "1688";

    /// Name of the taobao provider
    pub const TAOBAO: &str = "taobao";
}

/// Exchange rates
pub mod currency {
    use super::Duration;

    /// Source currency of provider prices
    pub const DEFAULT_FROM: &str = "CNY";

    /// Currency shown to clients
    pub const DEFAULT_TO: &str = "BRL";

    /// Interval between scheduled refreshes
    pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

    /// Delay between failed refresh attempts
    pub const RETRY_DELAY: Duration = Duration::from_secs(10);

    /// Search endpoint scraped for the current rate
    pub const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search";

    /// Element carrying the numeric rate
    pub const RATE_SELECTOR: &str = "span[data-value]";

    /// Consent cookie that skips the interstitial page
    pub const CONSENT_COOKIE: &str = "CONSENT=YES+srp.gws-20211018-0-RC1.fr+FX+634";
}

/// Client-facing status texts
pub mod status {
    /// Sent when a task fails or finds nothing
    pub const FAILURE: &str = "An error occurred.";

    /// Sent when a queued task starts
    pub const RETRIEVING: &str = "Retrieving products...";

    /// Sent while a backend materializes the submitted image
    pub const DOWNLOADING: &str = "Downloading image to file...";
}

/// Logging defaults
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Default directory for daily log files
    pub const DEFAULT_LOG_DIR: &str = "./logs";

    /// Prefix of daily log files
    pub const LOG_FILE_PREFIX: &str = "server";

    /// Daily log files kept before the oldest is removed
    pub const MAX_LOG_FILES: usize = 10;
}

/// Application directory name under the user config directory
pub const APP_DIR_NAME: &str = "source-finder";

// Re-export commonly used constants for convenience
pub use cache::ENTRY_TTL;
pub use heartbeat::SWEEP_INTERVAL;
pub use limits::{DEFAULT_POINTS, DEFAULT_WINDOW};
pub use providers::BOOTSTRAP_RETRY_DELAY;
