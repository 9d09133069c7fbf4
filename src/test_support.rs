//! Fixtures shared by unit tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{AppError, Result};
use crate::pipeline::encoding;
use crate::services::RemoteFetcher;
use crate::storage::JsonCatalog;

pub const TEXT_URL: &str = "https://www.aozora.gr.jp/cards/000879/files/123_ruby_1199.zip";
pub const CARD_URL: &str = "https://www.aozora.gr.jp/cards/000879/card123.html";
pub const HTML_URL: &str = "https://www.aozora.gr.jp/cards/000879/files/123_15167.html";
pub const CARD_456_URL: &str = "https://www.aozora.gr.jp/cards/000879/card456.html";

/// 「大川の水」 in Shift_JIS, as found inside the text archive.
pub const TEXT_BYTES: &[u8] = &[0x91, 0xE5, 0x90, 0xEC, 0x82, 0xCC, 0x90, 0x85, 0x0D, 0x0A];

pub const CARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="utf-8">
<title>図書カード：大川の水</title>
<link rel="stylesheet" href="../../style.css">
</head>
<body>
<a href="../../index.html">トップ</a>
<a href="../000879/files/123_15167.html">いますぐXHTML版で読む</a>
<a href="./files/123_ruby_1199.zip">123_ruby_1199.zip</a>
</body>
</html>
"#;

pub const PAGE_HTML: &str = r#"<?xml version="1.0" encoding="Shift_JIS"?>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="ja" lang="ja">
<head>
<meta http-equiv="Content-Type" content="text/html;charset=Shift_JIS" />
<link rel="stylesheet" type="text/css" href="../../aozora.css" />
<title>芥川竜之介 大川の水</title>
</head>
<body>
<div class="main_text">自分は、大川端に近い町に生まれた。</div>
</body>
</html>
"#;

/// Build a ZIP archive holding `entries` in order.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(*name, options.clone()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Catalog with book 123 (every rendition) and 456 (card only).
pub fn sample_catalog() -> JsonCatalog {
    JsonCatalog::from_records(vec![
        json!({
            "_id": "5c3e0f2a9d1b",
            "book_id": 123,
            "title": "大川の水",
            "title_yomi": "おおかわのみず",
            "authors": [{"person_id": 879, "last_name": "芥川", "first_name": "竜之介"}],
            "text_url": TEXT_URL,
            "text_encoding": "ShiftJIS",
            "card_url": CARD_URL,
            "html_url": HTML_URL,
            "html_encoding": "ShiftJIS"
        }),
        json!({
            "book_id": 456,
            "title": "羅生門",
            "authors": [{"person_id": 879, "last_name": "芥川", "first_name": "竜之介"}],
            "card_url": CARD_456_URL
        }),
    ])
    .unwrap()
}

/// Fetcher serving fixed bodies and counting calls. Unknown URLs are 404.
#[derive(Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// Shared counter of `fetch` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RemoteFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::fetch(url, Some(404), "Not Found"))
    }
}

/// Fetcher serving the three renditions of book 123 and the card of 456.
pub fn sample_fetcher() -> StaticFetcher {
    let page = encoding::encode(PAGE_HTML, "Shift_JIS").unwrap();
    StaticFetcher::default()
        .with(TEXT_URL, zip_bytes(&[("123_ruby_1199.txt", TEXT_BYTES)]))
        .with(CARD_URL, CARD_HTML.as_bytes().to_vec())
        .with(HTML_URL, page)
        .with(CARD_456_URL, CARD_HTML.replace("大川の水", "羅生門").into_bytes())
}
