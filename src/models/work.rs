// src/models/work.rs

//! Work identity, representation kinds and the metadata projection used for
//! rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Renderable form of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationKind {
    /// Zipped plain text, served in its original Shift_JIS bytes
    PlainText,
    /// The work's card page with preview metadata
    HtmlCard,
    /// The full XHTML rendition with preview metadata
    HtmlPage,
}

impl RepresentationKind {
    pub const ALL: [RepresentationKind; 3] = [Self::PlainText, Self::HtmlCard, Self::HtmlPage];

    /// Short extension used by the public API and cache keys.
    pub fn ext(self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::HtmlCard => "card",
            Self::HtmlPage => "html",
        }
    }

    /// Field of the book record holding the upstream URL.
    pub fn url_field(self) -> &'static str {
        match self {
            Self::PlainText => "text_url",
            Self::HtmlCard => "card_url",
            Self::HtmlPage => "html_url",
        }
    }

    /// Encoding of the upstream HTML. `None` for renditions served untouched.
    pub fn encoding(self) -> Option<&'static str> {
        match self {
            Self::PlainText => None,
            Self::HtmlCard => Some("utf-8"),
            Self::HtmlPage => Some("Shift_JIS"),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain; charset=Shift_JIS",
            Self::HtmlCard => "text/html; charset=utf-8",
            Self::HtmlPage => "text/html; charset=Shift_JIS",
        }
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

impl FromStr for RepresentationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.ext() == s)
            .ok_or_else(|| AppError::not_found(format!("unknown format '{s}'")))
    }
}

/// Cache key for one rendition of one work, e.g. `card123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: RepresentationKind, work_id: u64) -> Self {
        Self(format!("{}{}", kind.ext(), work_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The slice of a book record needed to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkMetadataRef {
    pub work_id: u64,
    pub title: String,
    /// First author's family name followed by given name.
    pub author: String,
    pub text_url: Option<String>,
    pub html_url: Option<String>,
    pub card_url: Option<String>,
}

impl WorkMetadataRef {
    /// Fields requested from the document store.
    pub const PROJECTION: [&'static str; 5] =
        ["title", "authors", "text_url", "html_url", "card_url"];

    /// Build from a (projected) book record.
    pub fn from_record(work_id: u64, record: &Value) -> Self {
        let text = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let author = record
            .get("authors")
            .and_then(Value::as_array)
            .and_then(|authors| authors.first())
            .map(|first| {
                let part = |field: &str| first.get(field).and_then(Value::as_str).unwrap_or("");
                format!("{}{}", part("last_name"), part("first_name"))
            })
            .unwrap_or_default();

        Self {
            work_id,
            title: text("title").unwrap_or_default(),
            author,
            text_url: text("text_url"),
            html_url: text("html_url"),
            card_url: text("card_url"),
        }
    }

    /// Upstream URL for `kind`, if the record carries one.
    pub fn url_for(&self, kind: RepresentationKind) -> Option<&str> {
        match kind {
            RepresentationKind::PlainText => self.text_url.as_deref(),
            RepresentationKind::HtmlCard => self.card_url.as_deref(),
            RepresentationKind::HtmlPage => self.html_url.as_deref(),
        }
    }
}
