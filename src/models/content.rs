// src/models/content.rs

//! Cached and rendered content.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `payload`.
pub fn fingerprint(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// A stored rendition: compressed bytes plus the fingerprint of the
/// uncompressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub compressed_payload: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Ready-to-serve bytes and their identity tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub fingerprint: String,
    pub payload: Vec<u8>,
}

impl RenderedContent {
    /// Wrap bytes that did not go through the cache.
    pub fn uncached(payload: Vec<u8>) -> Self {
        Self {
            fingerprint: fingerprint(&payload),
            payload,
        }
    }
}
