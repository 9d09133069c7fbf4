//! Local filesystem cache backend.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── card123.entry
//! ├── html123.entry
//! └── txt123.entry
//! ```
//!
//! Each entry file is a single JSON header line followed by the compressed
//! payload:
//!
//! ```text
//! {"fingerprint":"9f86d0…","expires_at":"2026-01-01T00:00:00Z"}\n
//! <zlib bytes>
//! ```
//!
//! Writes go to a unique temp file and are renamed into place, so a reader
//! sees either the old entry or the new one, never a mix. Readers never
//! delete: expired or unreadable files stay until the next `put` replaces
//! them or `flush_all` clears the directory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CacheEntry, CacheKey};
use crate::storage::{ContentCache, seal};

const ENTRY_EXTENSION: &str = "entry";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    fingerprint: String,
    expires_at: DateTime<Utc>,
}

/// Cache stored as one file per key under a directory.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root_dir: PathBuf,
}

impl LocalCache {
    /// Create a LocalCache rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the entry file path for a key.
    fn path(&self, key: &CacheKey) -> PathBuf {
        self.root_dir
            .join(format!("{}.{}", key.as_str(), ENTRY_EXTENSION))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = self.remove(&tmp).await {
                log::warn!("Failed to remove {}: {}", tmp.display(), cleanup);
            }
            return Err(AppError::Io(e));
        }
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self, path: &PathBuf) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Remove a file, ignoring one that is already gone.
    async fn remove(&self, path: &PathBuf) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn encode_entry(entry: &CacheEntry) -> Result<Vec<u8>> {
        let header = EntryHeader {
            fingerprint: entry.fingerprint.clone(),
            expires_at: entry.expires_at,
        };
        let mut bytes = serde_json::to_vec(&header)?;
        bytes.push(b'\n');
        bytes.extend_from_slice(&entry.compressed_payload);
        Ok(bytes)
    }

    fn decode_entry(bytes: &[u8]) -> Option<CacheEntry> {
        let split = bytes.iter().position(|&b| b == b'\n')?;
        let header: EntryHeader = serde_json::from_slice(&bytes[..split]).ok()?;
        Some(CacheEntry {
            fingerprint: header.fingerprint,
            compressed_payload: bytes[split + 1..].to_vec(),
            expires_at: header.expires_at,
        })
    }
}

fn unavailable(e: AppError) -> AppError {
    match e {
        AppError::CacheUnavailable(_) => e,
        other => AppError::cache(other),
    }
}

#[async_trait]
impl ContentCache for LocalCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.path(key);
        let Some(bytes) = self.read_bytes(&path).await.map_err(unavailable)? else {
            return Ok(None);
        };

        match Self::decode_entry(&bytes) {
            Some(entry) if !entry.is_expired(Utc::now()) => Ok(Some(entry)),
            Some(_) => {
                log::debug!("Cache entry {} expired", key);
                Ok(None)
            }
            None => {
                log::warn!("Ignoring unreadable cache file {}", path.display());
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> Result<CacheEntry> {
        let entry = seal(payload, ttl)?;
        let bytes = Self::encode_entry(&entry)?;
        self.write_bytes(&self.path(key), &bytes)
            .await
            .map_err(unavailable)?;
        Ok(entry)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut dir = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(unavailable(AppError::Io(e))),
        };

        let mut removed = 0usize;
        while let Some(item) = dir.next_entry().await.map_err(|e| unavailable(e.into()))? {
            let path = item.path();
            let is_ours = path
                .extension()
                .is_some_and(|ext| ext == ENTRY_EXTENSION || ext == "tmp");
            if is_ours {
                self.remove(&path).await.map_err(unavailable)?;
                removed += 1;
            }
        }

        log::info!(
            "Flushed {} cache files from {}",
            removed,
            self.root_dir.display()
        );
        Ok(())
    }
}
