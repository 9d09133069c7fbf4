// src/server/handlers.rs

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{RenderedContent, RepresentationKind};
use crate::server::AppState;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    format: Option<String>,
}

pub async fn card(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let kind = RepresentationKind::HtmlCard;
    respond(render(&state, &book_id, Ok(kind)).await, kind.content_type(), &headers)
}

pub async fn content(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Query(query): Query<ContentQuery>,
    headers: HeaderMap,
) -> Response {
    let kind = content_kind(query.format.as_deref());
    let content_type = kind.as_ref().map_or("", |kind| kind.content_type());
    respond(render(&state, &book_id, kind).await, content_type, &headers)
}

pub async fn metadata(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(describe(&state, &book_id).await, JSON_CONTENT_TYPE, &headers)
}

async fn render(
    state: &AppState,
    book_id: &str,
    kind: Result<RepresentationKind>,
) -> Result<RenderedContent> {
    let work_id = parse_book_id(book_id)?;
    state.delivery.get_rendered(work_id, kind?).await
}

async fn describe(state: &AppState, book_id: &str) -> Result<RenderedContent> {
    let work_id = parse_book_id(book_id)?;
    let record = state.delivery.record(work_id).await?;
    Ok(RenderedContent::uncached(serde_json::to_vec(&record)?))
}

fn parse_book_id(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| AppError::not_found(format!("invalid book id {raw:?}")))
}

/// `txt` when absent; the card is served on its own route.
fn content_kind(format: Option<&str>) -> Result<RepresentationKind> {
    match format.unwrap_or("txt") {
        "txt" => Ok(RepresentationKind::PlainText),
        "html" => Ok(RepresentationKind::HtmlPage),
        other => Err(AppError::not_found(format!("unknown format {other:?}"))),
    }
}

fn respond(
    result: Result<RenderedContent>,
    content_type: &'static str,
    headers: &HeaderMap,
) -> Response {
    let rendered = match result {
        Ok(rendered) => rendered,
        Err(e) => {
            if e.is_not_found() {
                log::debug!("Not found: {}", e);
            } else {
                log::warn!("Request failed: {}", e);
            }
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", rendered.fingerprint)) else {
        log::warn!("Unusable fingerprint {:?}", rendered.fingerprint);
        return StatusCode::NOT_FOUND.into_response();
    };

    if is_fresh(headers, &rendered.fingerprint) {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    (
        StatusCode::OK,
        [
            (header::ETAG, etag),
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
        ],
        rendered.payload,
    )
        .into_response()
}

/// Whether any `If-None-Match` tag names `fingerprint`.
///
/// Tags may be quoted or bare, weak (`W/`) or strong, comma-separated, or `*`.
/// A `-<coding>` suffix added for compressed responses is ignored.
fn is_fresh(headers: &HeaderMap, fingerprint: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|tag| {
            if tag == "*" {
                return true;
            }
            let tag = tag.strip_prefix("W/").unwrap_or(tag).trim_matches('"');
            let tag = tag.split_once('-').map_or(tag, |(fp, _)| fp);
            tag == fingerprint
        })
}
