//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Parse `raw` as an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}
