//! Redis cache backend.
//!
//! Each rendition is a hash `{fingerprint, data}` under its cache key, with
//! the TTL applied to the whole hash.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;

use crate::error::{AppError, Result};
use crate::models::{CacheEntry, CacheKey};
use crate::storage::{ContentCache, seal};

/// Cache shared by every server process pointed at the same Redis database.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Open a multiplexed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        log::info!("Connected to redis cache at {}", url);
        Ok(Self { conn })
    }
}

fn unavailable(e: redis::RedisError) -> AppError {
    AppError::cache(e)
}

#[async_trait]
impl ContentCache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let mut conn = self.conn.clone();
        let ((fingerprint, data), ttl_ms): ((Option<String>, Option<Vec<u8>>), i64) =
            redis::pipe()
                .cmd("HMGET")
                .arg(key.as_str())
                .arg("fingerprint")
                .arg("data")
                .cmd("PTTL")
                .arg(key.as_str())
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

        // PTTL is -2 for a missing key and -1 for one without expiry
        match (fingerprint, data) {
            (Some(fingerprint), Some(compressed_payload)) if ttl_ms > 0 => Ok(Some(CacheEntry {
                fingerprint,
                compressed_payload,
                expires_at: Utc::now() + chrono::Duration::milliseconds(ttl_ms),
            })),
            _ => Ok(None),
        }
    }

    async fn put(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> Result<CacheEntry> {
        let entry = seal(payload, ttl)?;
        // PEXPIRE with 0 would delete immediately; keep at least 1ms
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(key.as_str())
            .ignore()
            .cmd("HSET")
            .arg(key.as_str())
            .arg("fingerprint")
            .arg(entry.fingerprint.as_str())
            .arg("data")
            .arg(entry.compressed_payload.as_slice())
            .ignore()
            .cmd("PEXPIRE")
            .arg(key.as_str())
            .arg(ttl_ms)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(entry)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        log::info!("Flushed redis cache database");
        Ok(())
    }
}
