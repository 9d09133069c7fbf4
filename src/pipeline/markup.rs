// src/pipeline/markup.rs

//! Text rewrites applied to decoded card and XHTML pages.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{RepresentationKind, UpstreamConfig};

/// First opening `<head>` tag, attributes allowed. `<header>` never matches.
static HEAD_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("static regex"));

const OG_IMAGE_URL: &str = "https://www.aozora.gr.jp/images/top_logo.png";
const OG_DESCRIPTION: &str = "青空文庫は、利用に対価を求めない、インターネット電子図書館です。";

/// Absolute URL roots substituted for relative prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRoots {
    /// Site root, e.g. `https://www.aozora.gr.jp/`
    pub archive_root: String,
    /// Per-work card directory root, e.g. `https://www.aozora.gr.jp/cards/`
    pub card_root: String,
}

impl Default for LinkRoots {
    fn default() -> Self {
        Self::from(&UpstreamConfig::default())
    }
}

impl From<&UpstreamConfig> for LinkRoots {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            archive_root: config.archive_root.clone(),
            card_root: config.card_root.clone(),
        }
    }
}

/// Insert the Open Graph block right after the opening head tag.
///
/// Pages without a head element are returned unchanged.
pub fn inject_preview_metadata(html: &str, title: &str, author: &str) -> String {
    let Some(head) = HEAD_OPEN.find(html) else {
        return html.to_string();
    };

    let block = preview_block(title, author);
    let mut out = String::with_capacity(html.len() + block.len());
    out.push_str(&html[..head.end()]);
    out.push_str(&block);
    out.push_str(&html[head.end()..]);
    out
}

fn preview_block(title: &str, author: &str) -> String {
    let og_title = escape_attr(&format!("{title}({author})"));
    [
        format!(r#"<meta property="og:title" content="{og_title}">"#),
        r#"<meta property="og:type" content="book">"#.to_string(),
        format!(r#"<meta property="og:image" content="{OG_IMAGE_URL}">"#),
        r#"<meta property="og:image:type" content="image/png">"#.to_string(),
        r#"<meta property="og:image:width" content="100">"#.to_string(),
        r#"<meta property="og:image:height" content="100">"#.to_string(),
        format!(r#"<meta property="og:description" content="{OG_DESCRIPTION}">"#),
        r#"<meta name="twitter:card" content="summary">"#.to_string(),
    ]
    .iter()
    .fold(String::new(), |mut acc, tag| {
        acc.push('\n');
        acc.push_str(tag);
        acc
    })
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace relative path prefixes with absolute upstream URLs.
///
/// Plain string substitution over the whole document, in the order the
/// corpus' link layout requires: card pages live one directory below
/// `cards/`, XHTML pages two.
pub fn rewrite_relative_links(html: &str, kind: RepresentationKind, roots: &LinkRoots) -> String {
    match kind {
        RepresentationKind::HtmlCard => html
            .replace("../../", &roots.archive_root)
            .replace("../", &roots.card_root),
        RepresentationKind::HtmlPage => html.replace("../../", &roots.card_root),
        RepresentationKind::PlainText => html.to_string(),
    }
}
