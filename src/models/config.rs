//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream HTTP client settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Rendition cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Book metadata source
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Absolute roots used when rewriting relative links
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    ///
    /// - `PORT`: listen on `0.0.0.0:{PORT}`
    /// - `AOZORA_REDIS_URL`: redis connection URL
    /// - `AOZORA_CATALOG_PATH`: catalog JSON file
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("PORT") {
            self.server.bind = format!("0.0.0.0:{}", port.trim());
        }
        if let Ok(url) = std::env::var("AOZORA_REDIS_URL") {
            self.cache.redis_url = url;
        }
        if let Ok(path) = std::env::var("AOZORA_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(path);
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(AppError::validation(format!(
                "server.bind '{}' is not a socket address",
                self.server.bind
            )));
        }
        if !self.server.api_root.starts_with('/') || self.server.api_root.ends_with('/') {
            return Err(AppError::validation(
                "server.api_root must start with '/' and not end with '/'",
            ));
        }
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.cache.ttl_secs == 0 || self.cache.ttl_secs > CacheConfig::MAX_TTL_SECS {
            return Err(AppError::validation(format!(
                "cache.ttl_secs must be between 1 and {}",
                CacheConfig::MAX_TTL_SECS
            )));
        }
        for (name, root) in [
            ("upstream.archive_root", &self.upstream.archive_root),
            ("upstream.card_root", &self.upstream.card_root),
        ] {
            if Url::parse(root).is_err() || !root.ends_with('/') {
                return Err(AppError::validation(format!(
                    "{name} must be an absolute URL ending with '/'"
                )));
            }
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Path prefix of every route
    #[serde(default = "defaults::api_root")]
    pub api_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            api_root: defaults::api_root(),
        }
    }
}

/// Upstream HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header; the archive rejects some non-browser agents
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a transport error or 5xx (0 = single attempt)
    #[serde(default)]
    pub max_retries: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: 0,
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Which cache implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Local,
    Redis,
}

/// Rendition cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Lifetime of a cached rendition in seconds
    #[serde(default = "defaults::ttl")]
    pub ttl_secs: u64,

    /// Directory for the `local` backend
    #[serde(default = "defaults::cache_dir")]
    pub dir: PathBuf,

    /// Connection URL for the `redis` backend
    #[serde(default = "defaults::redis_url")]
    pub redis_url: String,

    /// Discard entries left by a previous run
    #[serde(default = "defaults::flush_on_startup")]
    pub flush_on_startup: bool,
}

impl CacheConfig {
    /// Longest accepted entry lifetime: 30 days.
    pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_secs: defaults::ttl(),
            dir: defaults::cache_dir(),
            redis_url: defaults::redis_url(),
            flush_on_startup: defaults::flush_on_startup(),
        }
    }
}

/// Book metadata source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON array of book records
    #[serde(default = "defaults::catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: defaults::catalog_path(),
        }
    }
}

/// Absolute roots substituted for relative link prefixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Replaces `../../` in card pages
    #[serde(default = "defaults::archive_root")]
    pub archive_root: String,

    /// Replaces `../` in card pages and `../../` in XHTML pages
    #[serde(default = "defaults::card_root")]
    pub card_root: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            archive_root: defaults::archive_root(),
            card_root: defaults::card_root(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn bind() -> String {
        "0.0.0.0:5000".into()
    }
    pub fn api_root() -> String {
        "/api/v0.1".into()
    }

    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn retry_delay() -> u64 {
        500
    }

    pub fn ttl() -> u64 {
        60
    }
    pub fn cache_dir() -> PathBuf {
        PathBuf::from("storage/cache")
    }
    pub fn redis_url() -> String {
        "redis://127.0.0.1:6379/0".into()
    }
    pub fn flush_on_startup() -> bool {
        true
    }

    pub fn catalog_path() -> PathBuf {
        PathBuf::from("data/books.json")
    }

    pub fn archive_root() -> String {
        "https://www.aozora.gr.jp/".into()
    }
    pub fn card_root() -> String {
        "https://www.aozora.gr.jp/cards/".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            backend = "local"
            ttl_secs = 300

            [fetcher]
            max_retries = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.backend, CacheBackend::Local);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.fetcher.max_retries, 2);
        assert_eq!(config.fetcher.timeout_secs, 30);
        assert_eq!(config.server.api_root, "/api/v0.1");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.upstream.card_root = "https://www.aozora.gr.jp/cards".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.ttl_secs = 10_000_000_000_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.ttl_secs = CacheConfig::MAX_TTL_SECS;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.server.bind = "localhost".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.server.bind, "0.0.0.0:5000");
    }
}
