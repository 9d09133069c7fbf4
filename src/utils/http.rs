// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::Result;
use crate::models::FetcherConfig;

/// Client builder preconfigured for upstream fetches.
///
/// Every request carries `Accept: */*` and the configured User-Agent.
pub fn client_builder(config: &FetcherConfig) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
}

/// Create the shared asynchronous HTTP client used for upstream fetches.
pub fn create_async_client(config: &FetcherConfig) -> Result<reqwest::Client> {
    let client = client_builder(config).build()?;
    Ok(client)
}
