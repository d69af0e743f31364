//! Canonical identity of a fetched page.
//!
//! Two things are canonicalized: the page URL (from `<link rel="canonical">`) and
//! the extracted text, whose whitespace and entities are normalized so the same
//! article always feeds the same characters into its fingerprint.

use url::Url;

use crate::Document;
use crate::text::collapse_whitespace;

/// Resolve a page's canonical URL.
///
/// The first `<link rel="canonical">` target is resolved against `page_url`. Anything
/// that does not resolve to an http(s) URL falls back to `page_url` itself.
pub fn canonical_url(doc: &Document, page_url: &str) -> String {
    doc.canonical_href()
        .and_then(|href| resolve_http(&href, page_url))
        .unwrap_or_else(|| page_url.to_string())
}

/// Resolve `href` against `base` and keep it only if the result is http(s).
pub fn resolve_http(href: &str, base: &str) -> Option<String> {
    let resolved = match Url::parse(base) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Normalize extracted text into its canonical form.
///
/// HTML entities left in the text are decoded, every whitespace run (including
/// non-breaking spaces) becomes a single space, and the ends are trimmed.
pub fn canonical_text(text: &str) -> String {
    collapse_whitespace(&html_escape::decode_html_entities(text))
}
