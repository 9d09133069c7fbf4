// src/services/delivery.rs

//! Cache-first access to renditions.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{CacheKey, RenderedContent, RepresentationKind};
use crate::services::RepresentationResolver;
use crate::storage::ContentCache;
use crate::storage::compression::decompress;

/// Serves renditions from the cache, resolving and storing them on a miss.
pub struct ContentDelivery {
    resolver: RepresentationResolver,
    cache: Arc<dyn ContentCache>,
    ttl: Duration,
}

impl ContentDelivery {
    pub fn new(resolver: RepresentationResolver, cache: Arc<dyn ContentCache>, ttl: Duration) -> Self {
        Self {
            resolver,
            cache,
            ttl,
        }
    }

    /// Return the bytes of `kind` for `work_id` with their fingerprint.
    ///
    /// An unreachable cache is bypassed: the rendition is resolved directly
    /// and fingerprinted locally.
    pub async fn get_rendered(
        &self,
        work_id: u64,
        kind: RepresentationKind,
    ) -> Result<RenderedContent> {
        let key = CacheKey::new(kind, work_id);

        let cache_available = match self.cache.get(&key).await {
            Ok(Some(entry)) => match decompress(&entry.compressed_payload) {
                Ok(payload) => {
                    log::debug!("Cache hit for {}", key);
                    return Ok(RenderedContent {
                        fingerprint: entry.fingerprint,
                        payload,
                    });
                }
                Err(e) => {
                    log::warn!("Discarding unreadable cache entry {}: {}", key, e);
                    true
                }
            },
            Ok(None) => {
                log::debug!("Cache miss for {}", key);
                true
            }
            Err(e @ AppError::CacheUnavailable(_)) => {
                log::warn!("Cache lookup for {} failed, resolving directly: {}", key, e);
                false
            }
            Err(e) => return Err(e),
        };

        let payload = self.resolver.resolve(work_id, kind).await?;
        if !cache_available {
            return Ok(RenderedContent::uncached(payload));
        }

        match self.cache.put(&key, &payload, self.ttl).await {
            Ok(entry) => Ok(RenderedContent {
                fingerprint: entry.fingerprint,
                payload,
            }),
            Err(e @ AppError::CacheUnavailable(_)) => {
                log::warn!("Cache store for {} failed: {}", key, e);
                Ok(RenderedContent::uncached(payload))
            }
            Err(e) => Err(e),
        }
    }

    /// Whole catalog record of `work_id`.
    pub async fn record(&self, work_id: u64) -> Result<Value> {
        self.resolver.record(work_id).await
    }

    /// Empty the cache, as done once at startup.
    pub async fn flush_cache(&self) -> Result<()> {
        self.cache.flush_all().await
    }
}
