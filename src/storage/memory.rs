// src/storage/memory.rs

//! In-process cache backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{CacheEntry, CacheKey};
use crate::storage::{ContentCache, seal};

/// Cache held in a map inside the server process.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, key: &CacheKey, entry: CacheEntry) {
        self.entries
            .write()
            .await
            .insert(key.as_str().to_string(), entry);
    }
}

#[async_trait]
impl ContentCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key.as_str()) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict unless a writer replaced it meanwhile
        let mut entries = self.entries.write().await;
        if entries
            .get(key.as_str())
            .is_some_and(|entry| entry.is_expired(now))
        {
            entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, payload: &[u8], ttl: Duration) -> Result<CacheEntry> {
        let entry = seal(payload, ttl)?;
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        // Expired entries of every key go on each write
        entries.retain(|_, existing| !existing.is_expired(now));
        entries.insert(key.as_str().to_string(), entry.clone());
        Ok(entry)
    }

    async fn flush_all(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
