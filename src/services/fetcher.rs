// src/services/fetcher.rs

//! Binary-safe retrieval of upstream artifacts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::FetcherConfig;
use crate::utils::http::create_async_client;
use crate::utils::parse_http_url;

/// Source of raw upstream bytes.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch `url` and return the body untouched.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`RemoteFetcher`] backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with its own client from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self::with_client(
            create_async_client(config)?,
            config.max_retries,
            Duration::from_millis(config.retry_delay_ms),
        ))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            max_retries,
            retry_delay,
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, None, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(
                url,
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::fetch(url, None, e))?;
        Ok(bytes.to_vec())
    }
}

/// Transport failures and 5xx may succeed on another attempt; 4xx will not.
fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::Fetch { status: None, .. } => true,
        AppError::Fetch {
            status: Some(code), ..
        } => *code >= 500,
        _ => false,
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if parse_http_url(url).is_none() {
            return Err(AppError::fetch(url, None, "not an absolute http(s) URL"));
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(bytes) => {
                    log::debug!("Fetched {} ({} bytes)", url, bytes.len());
                    return Ok(bytes);
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    log::warn!(
                        "Fetch attempt {}/{} failed: {}",
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::get;

    use super::*;
    use crate::utils::http::client_builder;

    const ZIP_LIKE: [u8; 6] = [0x50, 0x4B, 0x03, 0x04, 0xFF, 0x00];

    /// Serve a few fixed routes on a loopback port and return the base URL.
    async fn spawn_upstream(flaky_hits: Arc<AtomicUsize>) -> String {
        let app = Router::new()
            .route(
                "/files/123.zip",
                get(|| async { ([(header::CONTENT_TYPE, "application/zip")], ZIP_LIKE.to_vec()) }),
            )
            .route(
                "/echo",
                get(|headers: HeaderMap| async move {
                    let value = |name: header::HeaderName| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string()
                    };
                    format!("{}|{}", value(header::ACCEPT), value(header::USER_AGENT))
                }),
            )
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/flaky",
                get(move || {
                    let hits = Arc::clone(&flaky_hits);
                    async move {
                        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                            (StatusCode::SERVICE_UNAVAILABLE, "busy")
                        } else {
                            (StatusCode::OK, "ok")
                        }
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher(max_retries: u32) -> HttpFetcher {
        let config = FetcherConfig::default();
        // Loopback traffic must not go through an environment proxy
        let client = client_builder(&config).no_proxy().build().unwrap();
        HttpFetcher::with_client(client, max_retries, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_fetch_returns_raw_bytes() {
        let base = spawn_upstream(Arc::default()).await;
        let bytes = fetcher(0).fetch(&format!("{base}/files/123.zip")).await.unwrap();
        assert_eq!(bytes, ZIP_LIKE);
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_and_user_agent() {
        let base = spawn_upstream(Arc::default()).await;
        let body = fetcher(0).fetch(&format!("{base}/echo")).await.unwrap();
        let body = String::from_utf8(body).unwrap();

        let (accept, agent) = body.split_once('|').unwrap();
        assert_eq!(accept, "*/*");
        assert!(agent.starts_with("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let base = spawn_upstream(Arc::default()).await;
        let url = format!("{base}/missing");
        let err = fetcher(3).fetch(&url).await.unwrap_err();

        match err {
            AppError::Fetch {
                status, url: failed, ..
            } => {
                assert_eq!(status, Some(404));
                assert_eq!(failed, url);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_upstream(Arc::clone(&hits)).await;

        let err = fetcher(0).fetch(&format!("{base}/flaky")).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { status: Some(503), .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_on_server_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_upstream(Arc::clone(&hits)).await;

        let body = fetcher(1).fetch(&format!("{base}/flaky")).await.unwrap();
        assert_eq!(body, b"ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_error_has_no_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(0)
            .fetch(&format!("http://{addr}/a.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch { status: None, .. }));
    }

    #[tokio::test]
    async fn test_relative_url_rejected() {
        let err = fetcher(0).fetch("../files/123.zip").await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { status: None, .. }));
    }
}
