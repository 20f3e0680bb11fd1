//! Configuration management for Source Finder
//!
//! Settings are layered: built-in defaults, then a TOML file, then command
//! line overrides. Durations are written in humantime form (`30s`, `5h`).

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::app::cache::{CacheBackend, CacheConfig};
use crate::app::client::ClientConfig;
use crate::app::currency::{CurrencyConfig, RateSourceKind};
use crate::app::provider::{ProvidersConfig, SiteOverride};
use crate::constants::{self, cache, currency, heartbeat, http, limits, logging, providers, server};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerToml,
    pub heartbeat: HeartbeatToml,
    pub rate_limit: RateLimitToml,
    pub cache: CacheToml,
    pub client: ClientToml,
    pub providers: ProvidersToml,
    pub currency: CurrencyToml,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerToml {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: server::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatToml {
    /// Time between liveness sweeps
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for HeartbeatToml {
    fn default() -> Self {
        Self {
            interval: heartbeat::SWEEP_INTERVAL,
        }
    }
}

/// Per-address quota shared by upgrades and messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitToml {
    pub points: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateLimitToml {
    fn default() -> Self {
        Self {
            points: limits::DEFAULT_POINTS,
            window: limits::DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheToml {
    pub backend: CacheBackend,
    /// Directory of the file backend (system default if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheToml {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            cache_root: None,
            ttl: cache::ENTRY_TTL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub tcp_keepalive: Option<Duration>,
    pub tcp_nodelay: bool,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub pool_idle_timeout: Option<Duration>,
    pub pool_max_per_host: usize,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Outbound requests per second
    pub rate_limit_rps: u32,
    pub max_image_bytes: usize,
}

impl Default for ClientToml {
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersToml {
    /// Delay between bootstrap attempts
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    pub enabled: Vec<String>,
    /// Profile overrides, e.g. `[providers.sites.taobao]`
    pub sites: BTreeMap<String, SiteOverride>,
}

impl Default for ProvidersToml {
    fn default() -> Self {
        Self {
            retry_delay: providers::BOOTSTRAP_RETRY_DELAY,
            enabled: vec![providers::ALIBABA_1688.to_string(), providers::TAOBAO.to_string()],
            sites: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyToml {
    pub from: String,
    pub to: String,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    pub source: RateSourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_rate: Option<f64>,
    pub search_url: String,
}

impl Default for CurrencyToml {
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

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Also write daily-rotated log files
    pub file_logging: bool,
    /// Directory of the daily log files
    pub log_dir: PathBuf,
    /// Number of daily files kept on disk
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            file_logging: false,
            log_dir: PathBuf::from(logging::DEFAULT_LOG_DIR),
            max_log_files: logging::MAX_LOG_FILES,
        }
    }
}

impl LoggingConfig {
    /// Daily-rotated appender under `log_dir` keeping `max_log_files` files
    pub fn file_appender(&self) -> Result<RollingFileAppender> {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(logging::LOG_FILE_PREFIX)
            .max_log_files(self.max_log_files)
            .build(&self.log_dir)
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to open log directory {}: {}",
                    self.log_dir.display(),
                    e
                ))
            })
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub cache_dir: Option<PathBuf>,
}

/// Settings in the shape the runtime components take them
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen_addr: SocketAddr,
    pub heartbeat_interval: Duration,
    pub rate_limit_points: u32,
    pub rate_limit_window: Duration,
    pub cache: CacheConfig,
    pub client: ClientConfig,
    pub providers: ProvidersConfig,
    pub currency: CurrencyConfig,
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            listen_addr: SocketAddr::new(self.server.bind, self.server.port),
            heartbeat_interval: self.heartbeat.interval,
            rate_limit_points: self.rate_limit.points,
            rate_limit_window: self.rate_limit.window,
            cache: self.cache.to_runtime_config(),
            client: self.client.to_runtime_config(),
            providers: self.providers.to_runtime_config(),
            currency: self.currency.to_runtime_config(),
        }
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit, otherwise the first standard location found)
    ///
    /// Command line overrides are applied afterwards with
    /// [`apply_overrides`](Self::apply_overrides).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if an explicitly named file does not
    /// exist, and `ConfigError::InvalidFormat` if the file is not valid TOML.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(dir) = &overrides.cache_dir {
            self.cache.cache_root = Some(dir.clone());
        }
    }

    /// Check values that would only fail later at startup
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.rate_limit.points == 0 {
            errors.push("rate_limit.points must be at least 1".to_string());
        }
        if self.rate_limit.window.is_zero() {
            errors.push("rate_limit.window must be longer than zero".to_string());
        }
        if self.heartbeat.interval.is_zero() {
            errors.push("heartbeat.interval must be longer than zero".to_string());
        }
        if self.logging.file_logging && self.logging.max_log_files == 0 {
            errors.push("logging.max_log_files must be at least 1".to_string());
        }
        if self.client.rate_limit_rps == 0 {
            errors.push("client.rate_limit_rps must be at least 1".to_string());
        }
        if self.currency.refresh_interval.is_zero() {
            errors.push("currency.refresh_interval must be longer than zero".to_string());
        }
        if self.currency.source == RateSourceKind::Fixed {
            match self.currency.fixed_rate {
                Some(rate) if rate.is_finite() && rate > 0.0 => {}
                _ => errors.push("currency.fixed_rate must be a positive number when source = \"fixed\"".to_string()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors }.into())
        }
    }

    /// Write the default configuration file if none exists yet
    ///
    /// Returns the path of the user configuration file.
    pub async fn initialize_first_run() -> Result<PathBuf> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            return Ok(config_path);
        }

        info!("Creating default configuration file...");
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;

        Ok(config_path)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::from)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![
            PathBuf::from("./source-finder.toml"),
            PathBuf::from("./config.toml"),
        ];
        if let Ok(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Config file path for the current user
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join(constants::APP_DIR_NAME).join("config.toml"))
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Default configuration with comments, as written by `config init`
    pub fn generate_default_config_content() -> String {
        let default_cache_path = dirs::config_dir()
            .map(|dir| dir.join(constants::APP_DIR_NAME).join("cache"))
            .unwrap_or_else(|| PathBuf::from("./cache"));

        format!(
            r#"# Source Finder Configuration
# Durations accept humantime values such as "30s", "10m" or "5h".

[server]
bind = "0.0.0.0"
port = {port}

[heartbeat]
# Clients that miss one probe are terminated at the following sweep
interval = "30s"

[rate_limit]
# Upgrades and messages allowed per remote address within one window
points = {points}
window = "2s"

[cache]
# "file" keeps entries across restarts, "memory" does not
backend = "file"
# Default: {cache_path}
# cache_root = "/path/to/cache"
ttl = "5h"

[client]
tcp_keepalive = "30s"
tcp_nodelay = true
pool_idle_timeout = "1m 30s"
pool_max_per_host = {pool}
request_timeout = "1m"
connect_timeout = "30s"
user_agent = "{user_agent}"
rate_limit_rps = {rps}
max_image_bytes = {max_image}

[providers]
# Delay between bootstrap attempts
retry_delay = "10s"
enabled = ["1688", "taobao"]

# Any profile field can be overridden per site:
# [providers.sites.taobao]
# upload_url = "https://example.com/upload"
# upload_field = "image"

[currency]
from = "CNY"
to = "BRL"
refresh_interval = "1h"
retry_delay = "10s"
# "google" scrapes the rate, "fixed" uses fixed_rate
source = "google"
# fixed_rate = 0.7
search_url = "{search_url}"

[logging]
level = "info"  # error, warn, info, debug, trace
file_logging = false
log_dir = "./logs"
max_log_files = {max_log_files}
"#,
            port = server::DEFAULT_PORT,
            max_log_files = logging::MAX_LOG_FILES,
            points = limits::DEFAULT_POINTS,
            cache_path = default_cache_path.display(),
            pool = http::POOL_MAX_PER_HOST,
            user_agent = http::USER_AGENT,
            rps = limits::DEFAULT_OUTBOUND_RPS,
            max_image = http::MAX_IMAGE_BYTES,
            search_url = currency::GOOGLE_SEARCH_URL,
        )
    }
}

impl CacheToml {
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            backend: self.backend,
            cache_root: self.cache_root.clone(),
            ttl: self.ttl,
        }
    }
}

impl ClientToml {
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive,
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            user_agent: self.user_agent.clone(),
            rate_limit_rps: self.rate_limit_rps,
            max_image_bytes: self.max_image_bytes,
        }
    }
}

impl ProvidersToml {
    pub fn to_runtime_config(&self) -> ProvidersConfig {
        ProvidersConfig {
            retry_delay: self.retry_delay,
            enabled: self.enabled.clone(),
            sites: self.sites.clone(),
        }
    }
}

impl CurrencyToml {
    pub fn to_runtime_config(&self) -> CurrencyConfig {
        CurrencyConfig {
            from: self.from.clone(),
            to: self.to.clone(),
            refresh_interval: self.refresh_interval,
            retry_delay: self.retry_delay,
            source: self.source,
            fixed_rate: self.fixed_rate,
            search_url: self.search_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(30));
        assert_eq!(config.rate_limit.points, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(2));
        assert_eq!(config.cache.ttl, Duration::from_secs(5 * 3600));
        assert_eq!(config.currency.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.providers.enabled, vec!["1688", "taobao"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_file_matches_defaults() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("# Source Finder Configuration"));
    }

    #[test]
    fn test_effective_config_round_trips() {
        let mut config = AppConfig::default();
        config.currency.source = RateSourceKind::Fixed;
        config.currency.fixed_rate = Some(0.7);
        config.providers.sites.insert(
            "taobao".to_string(),
            SiteOverride {
                upload_field: Some("image".to_string()),
                ..Default::default()
            },
        );

        let rendered = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
[server]
port = 8080

[cache]
backend = "memory"
ttl = "1h"
"#,
        )
        .unwrap();

        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.cache.backend, CacheBackend::Memory);
        assert_eq!(parsed.cache.ttl, Duration::from_secs(3600));
        assert_eq!(parsed.rate_limit, RateLimitToml::default());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_overrides(&ConfigOverrides {
            bind: Some(IpAddr::from([127, 0, 0, 1])),
            port: Some(9000),
            cache_dir: Some(PathBuf::from("/tmp/sf-cache")),
        });

        let runtime = config.to_runtime_config();
        assert_eq!(runtime.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(runtime.cache.cache_root, Some(PathBuf::from("/tmp/sf-cache")));
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = AppConfig::default();
        config.rate_limit.points = 0;
        config.currency.source = RateSourceKind::Fixed;

        match config.validate() {
            Err(AppError::Config(ConfigError::ValidationFailed { errors })) => {
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_log_files_are_capped() {
        let mut config = AppConfig::default();
        assert_eq!(config.logging.max_log_files, 10);

        config.logging.file_logging = true;
        config.logging.max_log_files = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_appender_writes_prefixed_daily_file() {
        use std::io::Write;

        let temp_dir = TempDir::new().unwrap();
        let logging = LoggingConfig {
            file_logging: true,
            log_dir: temp_dir.path().to_path_buf(),
            max_log_files: 2,
            ..LoggingConfig::default()
        };

        let mut appender = logging.file_appender().unwrap();
        appender.write_all(b"Ready and listening\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with(logging::LOG_FILE_PREFIX));
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(temp_dir.path().join("nope.toml"))).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("source-finder.toml");
        tokio::fs::write(
            &path,
            r#"
[logging]
level = "debug"

[currency]
source = "fixed"
fixed_rate = 0.7
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load(Some(path)).await.unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.currency.fixed_rate, Some(0.7));
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_OUTBOUND_RPS);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        tokio::fs::write(&path, "[server\nport = ").await.unwrap();

        let result = AppConfig::load(Some(path)).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidFormat(_)))
        ));
    }
}
