// src/error.rs

//! Unified error handling for the content service.

use std::fmt;

use thiserror::Error;

/// Result type alias for content operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown work id, or the work has no URL for the requested rendition
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream returned a non-2xx status or the transport failed
    #[error("Fetch failed for {url} (status {}): {message}", status_label(.status))]
    Fetch {
        status: Option<u16>,
        url: String,
        message: String,
    },

    /// Archive bytes could not be parsed
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// Archive parsed but holds no entries
    #[error("Archive contains no entries")]
    EmptyArchive,

    /// Text encoding conversion failed
    #[error("Decode error ({encoding}): {message}")]
    Decode { encoding: String, message: String },

    /// Cache backend could not be reached or returned garbage
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl AppError {
    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            status,
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed archive error.
    pub fn malformed_archive(message: impl fmt::Display) -> Self {
        Self::MalformedArchive(message.to_string())
    }

    /// Create a decode error for the named encoding.
    pub fn decode(encoding: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            encoding: encoding.into(),
            message: message.to_string(),
        }
    }

    /// Create a cache-unavailable error.
    pub fn cache(message: impl fmt::Display) -> Self {
        Self::CacheUnavailable(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this is the "truly absent" case rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
