// src/services/resolver.rs

//! Turns a `(work, representation)` pair into ready-to-serve bytes.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{RepresentationKind, WorkMetadataRef};
use crate::pipeline::{
    LinkRoots, encoding, extract_single_entry, inject_preview_metadata, rewrite_relative_links,
};
use crate::services::RemoteFetcher;
use crate::storage::MetadataStore;

/// Fetches and transforms upstream artifacts for one rendition.
pub struct RepresentationResolver {
    catalog: Arc<dyn MetadataStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    roots: LinkRoots,
}

impl RepresentationResolver {
    pub fn new(
        catalog: Arc<dyn MetadataStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        roots: LinkRoots,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            roots,
        }
    }

    /// Load the metadata projection of `work_id`.
    pub async fn metadata(&self, work_id: u64) -> Result<WorkMetadataRef> {
        let record = self
            .catalog
            .find_work_metadata(work_id, &WorkMetadataRef::PROJECTION)
            .await?
            .ok_or_else(|| AppError::not_found(format!("book {work_id}")))?;
        Ok(WorkMetadataRef::from_record(work_id, &record))
    }

    /// Load the whole record of `work_id`.
    pub async fn record(&self, work_id: u64) -> Result<serde_json::Value> {
        self.catalog
            .find_work_metadata(work_id, &[])
            .await?
            .ok_or_else(|| AppError::not_found(format!("book {work_id}")))
    }

    /// Produce the bytes of `kind` for `work_id`.
    pub async fn resolve(&self, work_id: u64, kind: RepresentationKind) -> Result<Vec<u8>> {
        let meta = self.metadata(work_id).await?;
        let url = meta.url_for(kind).ok_or_else(|| {
            AppError::not_found(format!("book {work_id} has no {}", kind.url_field()))
        })?;

        log::info!("Resolving {} of book {} from {}", kind, work_id, url);
        let body = self.fetcher.fetch(url).await?;

        match kind.encoding() {
            None => extract_single_entry(&body),
            Some(encoding_name) => self.render_html(&meta, kind, &body, encoding_name),
        }
    }

    /// Decode, annotate, rewrite and re-encode an HTML page.
    fn render_html(
        &self,
        meta: &WorkMetadataRef,
        kind: RepresentationKind,
        body: &[u8],
        encoding_name: &str,
    ) -> Result<Vec<u8>> {
        let html = encoding::decode(body, encoding_name)?;
        let html = inject_preview_metadata(&html, &meta.title, &meta.author);
        let html = rewrite_relative_links(&html, kind, &self.roots);
        encoding::encode(&html, encoding_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        CARD_URL, HTML_URL, StaticFetcher, TEXT_BYTES, TEXT_URL, sample_catalog, sample_fetcher,
    };

    fn resolver(fetcher: StaticFetcher) -> RepresentationResolver {
        RepresentationResolver::new(
            Arc::new(sample_catalog()),
            Arc::new(fetcher),
            LinkRoots::default(),
        )
    }

    #[tokio::test]
    async fn test_metadata_projection() {
        let meta = resolver(sample_fetcher()).metadata(123).await.unwrap();
        assert_eq!(meta.title, "大川の水");
        assert_eq!(meta.author, "芥川竜之介");
        assert_eq!(meta.text_url.as_deref(), Some(TEXT_URL));
    }

    #[tokio::test]
    async fn test_record_is_whole_document() {
        let record = resolver(sample_fetcher()).record(123).await.unwrap();
        assert_eq!(record["title_yomi"], "おおかわのみず");
        assert!(record.get("_id").is_none());

        let err = resolver(sample_fetcher()).record(999).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_plain_text_is_extracted_untouched() {
        let bytes = resolver(sample_fetcher())
            .resolve(123, RepresentationKind::PlainText)
            .await
            .unwrap();
        assert_eq!(bytes, TEXT_BYTES);
    }

    #[tokio::test]
    async fn test_card_is_annotated_and_rewritten() {
        let bytes = resolver(sample_fetcher())
            .resolve(123, RepresentationKind::HtmlCard)
            .await
            .unwrap();
        let html = String::from_utf8(bytes).unwrap();

        assert!(html.contains(
            "<head>\n<meta property=\"og:title\" content=\"大川の水(芥川竜之介)\">"
        ));
        assert!(html.contains(r#"href="https://www.aozora.gr.jp/index.html""#));
        assert!(html.contains(r#"href="https://www.aozora.gr.jp/cards/000879/files/123_15167.html""#));
        assert!(!html.contains("../"));
    }

    #[tokio::test]
    async fn test_page_stays_shift_jis() {
        let bytes = resolver(sample_fetcher())
            .resolve(123, RepresentationKind::HtmlPage)
            .await
            .unwrap();

        assert!(String::from_utf8(bytes.clone()).is_err());
        let html = encoding::decode(&bytes, "Shift_JIS").unwrap();
        assert!(html.contains("content=\"大川の水(芥川竜之介)\""));
        assert!(html.contains(r#"href="https://www.aozora.gr.jp/cards/aozora.css""#));
        assert!(html.contains("自分は、大川端に近い町に生まれた。"));
    }

    #[tokio::test]
    async fn test_unknown_book_is_not_found() {
        let fetcher = sample_fetcher();
        let calls = fetcher.calls();
        let err = resolver(fetcher)
            .resolve(999, RepresentationKind::HtmlCard)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_url_is_not_found() {
        // Book 456 has a card but no XHTML rendition
        let err = resolver(sample_fetcher())
            .resolve(456, RepresentationKind::HtmlPage)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upstream_errors_propagate() {
        let fetcher = StaticFetcher::default()
            .with(TEXT_URL, b"<html>not a zip</html>".to_vec())
            .with(CARD_URL, vec![0xFF, 0xFE, 0xFD]);

        let err = resolver(fetcher)
            .resolve(123, RepresentationKind::PlainText)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedArchive(_)));

        let fetcher = StaticFetcher::default().with(CARD_URL, vec![0xFF, 0xFE, 0xFD]);
        let err = resolver(fetcher)
            .resolve(123, RepresentationKind::HtmlCard)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Decode { .. }));

        let err = resolver(StaticFetcher::default())
            .resolve(123, RepresentationKind::HtmlPage)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch { status: Some(404), ref url, .. } if url == HTML_URL));
    }
}
