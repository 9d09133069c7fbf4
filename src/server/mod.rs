// src/server/mod.rs

//! HTTP surface over the delivery facade.

mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderValue, header};
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::LinkRoots;
use crate::services::{ContentDelivery, HttpFetcher, RepresentationResolver};
use crate::storage::{JsonCatalog, open_cache};

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub delivery: Arc<ContentDelivery>,
}

impl AppState {
    pub fn new(delivery: ContentDelivery) -> Self {
        Self {
            delivery: Arc::new(delivery),
        }
    }

    /// Load the catalog, open the cache, and wire the services.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let catalog = JsonCatalog::load(&config.catalog.path)?;
        let fetcher = HttpFetcher::new(&config.fetcher)?;
        let cache = open_cache(&config.cache).await?;
        log::info!("Using {:?} cache with {}s TTL", config.cache.backend, config.cache.ttl_secs);

        let resolver = RepresentationResolver::new(
            Arc::new(catalog),
            Arc::new(fetcher),
            LinkRoots::from(&config.upstream),
        );
        Ok(Self::new(ContentDelivery::new(resolver, cache, config.cache.ttl())))
    }
}

/// Build the application router mounted under `api_root`.
pub fn router(api_root: &str, state: AppState) -> Router {
    let books = Router::new()
        .route("/:book_id", get(handlers::metadata))
        .route("/:book_id/card", get(handlers::card))
        .route("/:book_id/content", get(handlers::content))
        .with_state(state);

    Router::new()
        .nest(&format!("{api_root}/books"), books)
        .layer(CompressionLayer::new())
        .layer(from_fn(tag_content_coding))
        .layer(CorsLayer::permissive())
        .layer(from_fn(access_log))
}

/// Give each content coding its own strong validator: `"<fp>"` becomes
/// `"<fp>-gzip"` when the body went out gzipped.
async fn tag_content_coding(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers();
    let coding = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok());
    let strong = headers
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .and_then(|etag| etag.strip_prefix('"')?.strip_suffix('"'));
    let tagged = match (coding, strong) {
        (Some(coding), Some(fp)) => HeaderValue::from_str(&format!("\"{fp}-{coding}\"")).ok(),
        _ => None,
    };

    if let Some(etag) = tagged {
        response.headers_mut().insert(header::ETAG, etag);
    }
    response
}

async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    log::info!(
        "{} {} {} {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Serve `state` on `config.server.bind` until the process stops.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&config.server.bind).await?;
    log::info!(
        "Listening on http://{}{}",
        listener.local_addr()?,
        config.server.api_root
    );
    axum::serve(listener, router(&config.server.api_root, state)).await?;
    Ok(())
}
