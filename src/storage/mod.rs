//! Storage abstractions: the rendition cache and the book catalog.
//!
//! Cache backends:
//! - [`MemoryCache`]: process-local map, the default
//! - [`LocalCache`]: one file per key, survives restarts
//! - `RedisCache`: shared across processes (`redis` feature)
//!
//! Every backend stores `{fingerprint, zlib(payload)}` with a fixed TTL.
//! There is no per-key locking: concurrent misses both populate the key and
//! the last write wins.

pub mod catalog;
pub mod compression;
pub mod local;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{CacheBackend, CacheConfig, CacheEntry, CacheKey, fingerprint};

// Re-export for convenience
pub use catalog::{JsonCatalog, MetadataStore};
pub use local::LocalCache;
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

/// Key-value store for compressed renditions.
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Look up a live entry. Expired entries are reported as absent.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Fingerprint and compress `payload`, then store it for `ttl`,
    /// replacing any existing entry.
    async fn put(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> Result<CacheEntry>;

    /// Drop every entry.
    async fn flush_all(&self) -> Result<()>;
}

/// Build the entry a backend persists for `payload`.
pub fn seal(payload: &[u8], ttl: Duration) -> Result<CacheEntry> {
    let expires_at = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AppError::config(format!("cache TTL {ttl:?} out of range")))?;
    Ok(CacheEntry {
        fingerprint: fingerprint(payload),
        compressed_payload: compression::compress(payload)?,
        expires_at,
    })
}

/// Open the configured cache backend.
pub async fn open_cache(config: &CacheConfig) -> Result<Arc<dyn ContentCache>> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheBackend::Local => Ok(Arc::new(LocalCache::new(&config.dir))),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => Ok(Arc::new(RedisCache::connect(&config.redis_url).await?)),
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => Err(AppError::config(
            "cache.backend = \"redis\" requires the `redis` feature",
        )),
    }
}
