//! Append-only file cache store
//!
//! Entries are written as one JSON document per line to
//! `<root>/entries.jsonl`. The file is read once at open; afterwards the
//! in-memory copy serves lookups and each insert appends a single line.
//! Purging rewrites the file through a temporary file and an atomic rename.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::constants::cache;
use crate::errors::{CacheError, CacheResult};

use super::record::{newest_valid, CacheEntry, CacheKey};
use super::store::{CacheStats, CacheStore};

/// Cache store persisted to a JSON-lines file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Mirror of the file; the write lock also serializes file writes
    entries: RwLock<Vec<CacheEntry>>,
}

impl FileStore {
    /// Open the store under `root`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns `CacheError::DirectoryNotAccessible` if the root cannot be
    /// created and `CacheError::Io` if an existing entries file cannot be
    /// read. Lines that fail to parse are skipped with a warning.
    pub async fn open(root: &Path) -> CacheResult<Self> {
        Self::ensure_directory_exists(root).await?;

        let path = root.join(cache::ENTRIES_FILE);
        let entries = if fs::try_exists(&path).await? {
            Self::load_entries(&path).await?
        } else {
            Vec::new()
        };

        info!(
            "Opened cache store at {} with {} entries",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the entries file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|e| {
                error!("Failed to create cache directory: {}", e);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }

    async fn load_entries(path: &Path) -> CacheResult<Vec<CacheEntry>> {
        let content = fs::read_to_string(path).await?;
        let mut entries = Vec::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CacheEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    "Skipping corrupt cache line {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                ),
            }
        }

        Ok(entries)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(cache::TEMP_FILE_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn find_valid(&self, key: &CacheKey, now: DateTime<Utc>) -> CacheResult<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        Ok(newest_valid(entries.iter(), key, now).cloned())
    }

    async fn insert(&self, entry: CacheEntry) -> CacheResult<()> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut entries = self.entries.write().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(
            provider = %entry.provider_name,
            hash = %entry.content_hash,
            "Appended cache entry"
        );
        entries.push(entry);
        Ok(())
    }

    async fn stats(&self, now: DateTime<Utc>) -> CacheResult<CacheStats> {
        Ok(CacheStats::from_entries(self.entries.read().await.iter(), now))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let mut entries = self.entries.write().await;
        let kept: Vec<CacheEntry> = entries
            .iter()
            .filter(|entry| entry.is_valid_at(now))
            .cloned()
            .collect();
        let removed = entries.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        let mut content = String::new();
        for entry in &kept {
            content.push_str(&serde_json::to_string(entry)?);
            content.push('\n');
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, content).await?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            error!("Failed to replace cache file: {}", e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Io(e));
        }

        *entries = kept;
        info!("Purged {} expired cache entries", removed);
        Ok(removed)
    }
}
