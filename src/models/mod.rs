// src/models/mod.rs

//! Domain models for the content service.

mod config;
mod content;
mod work;

// Re-export all public types
pub use config::{
    CacheBackend, CacheConfig, CatalogConfig, Config, FetcherConfig, ServerConfig, UpstreamConfig,
};
pub use content::{CacheEntry, RenderedContent, fingerprint};
pub use work::{CacheKey, RepresentationKind, WorkMetadataRef};
