//! Cache configuration types and defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{cache, APP_DIR_NAME};
use crate::errors::{CacheError, CacheResult};

/// Storage engine behind the result cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Append-only JSON-lines file under the cache root
    #[default]
    File,
    /// Process-local entries, lost on restart
    Memory,
}

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Root directory for the file backend (OS-specific if None)
    pub cache_root: Option<PathBuf>,
    /// Lifetime of a newly written entry
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            cache_root: None,
            ttl: cache::ENTRY_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a file-backed configuration rooted at `cache_root`
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self {
            cache_root: Some(cache_root),
            ..Default::default()
        }
    }

    /// Create an in-memory configuration
    pub fn in_memory() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ..Default::default()
        }
    }

    pub fn with_backend(mut self, backend: CacheBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Directory the file backend writes to
    ///
    /// Uses the configured root, otherwise the system config directory:
    /// - Linux: ~/.config/source-finder/cache
    /// - macOS: ~/Library/Application Support/source-finder/cache
    /// - Windows: %APPDATA%/source-finder/cache
    pub fn resolve_root(&self) -> CacheResult<PathBuf> {
        match &self.cache_root {
            Some(path) => Ok(path.clone()),
            None => Ok(dirs::config_dir()
                .ok_or_else(|| CacheError::DirectoryNotAccessible {
                    path: PathBuf::from("system config directory"),
                })?
                .join(APP_DIR_NAME)
                .join("cache")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::File);
        assert_eq!(config.cache_root, None);
        assert_eq!(config.ttl, Duration::from_secs(5 * 60 * 60));
    }

    #[test]
    fn test_config_builder() {
        let root = PathBuf::from("/tmp/source-finder-test");
        let config = CacheConfig::with_cache_root(root.clone())
            .with_ttl(Duration::from_secs(60))
            .with_backend(CacheBackend::Memory);

        assert_eq!(config.resolve_root().unwrap(), root);
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.backend, CacheBackend::Memory);
    }

    #[test]
    fn test_backend_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: CacheBackend,
        }
        let parsed: Wrapper = toml::from_str("backend = \"memory\"").unwrap();
        assert_eq!(parsed.backend, CacheBackend::Memory);
    }
}
