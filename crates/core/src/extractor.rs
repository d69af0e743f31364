//! Fetching an article page and pulling out its readable content.

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::canonical::{canonical_text, canonical_url, resolve_http};
use crate::fetch::Fetcher;
use crate::readability::{Readability, ReadabilityConfig};
use crate::text::non_blank;
use crate::{Document, LumenError};

/// What could be recovered from one article page.
///
/// Every field but `canonical_url` is best-effort. When the page could not be
/// fetched or parsed, `extraction_error` says why and the content fields are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedContent {
    pub canonical_url: String,
    pub title: Option<String>,
    pub main_text: Option<String>,
    pub rich_html: Option<String>,
    pub excerpt: Option<String>,
    pub lead_image_url: Option<String>,
    pub extraction_error: Option<String>,
}

impl ExtractedContent {
    /// The result for a page that could not be retrieved or read.
    pub fn failed(url: &str, cause: &LumenError) -> Self {
        Self { canonical_url: url.to_string(), extraction_error: Some(cause.to_string()), ..Default::default() }
    }

    pub fn is_error(&self) -> bool {
        self.extraction_error.is_some()
    }
}

/// Fetches pages and runs the readability heuristic over them.
#[derive(Clone)]
pub struct ContentExtractor {
    fetcher: Arc<dyn Fetcher>,
    readability: Readability,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ReadabilityConfig) -> Self {
        Self { fetcher, readability: Readability::with_config(config) }
    }

    /// Fetch `url` and extract it. Never fails; see [`ExtractedContent::extraction_error`].
    pub async fn extract(&self, url: &str) -> ExtractedContent {
        match self.fetcher.fetch_text(url).await {
            Ok(html) => self.extract_html(url, &html),
            Err(e) => {
                tracing::debug!(url, error = %e, "page fetch failed");
                ExtractedContent::failed(url, &e)
            }
        }
    }

    /// Extract already-fetched `html` that was served from `url`.
    pub fn extract_html(&self, url: &str, html: &str) -> ExtractedContent {
        let doc = match Document::parse_with_url(html, url) {
            Ok(doc) => doc,
            Err(e) => return ExtractedContent::failed(url, &e),
        };
        let base_url = doc.base_url().cloned();
        let canonical_url = canonical_url(&doc, url);
        let title_tag = doc.title();
        let description = doc.extract_description();
        let og_image = doc.extract_image();

        let readable = match self.readability.parse(html, base_url.as_ref()) {
            Ok(readable) => Some(readable),
            Err(LumenError::NoContent) => None,
            Err(e) => {
                tracing::debug!(url, error = %e, "readability failed");
                None
            }
        };

        let (title, main_text, rich_html, excerpt, lead_image) = match readable {
            Some(r) => (
                r.title,
                non_blank(Some(canonical_text(&r.text))),
                non_blank(Some(r.html)),
                r.excerpt,
                r.lead_image.and_then(|src| absolute_image(&src, base_url.as_ref())),
            ),
            None => (None, None, None, None, None),
        };

        ExtractedContent {
            canonical_url,
            title: title.or(title_tag),
            main_text,
            rich_html,
            excerpt: excerpt.or(description),
            lead_image_url: lead_image.or(og_image),
            extraction_error: None,
        }
    }
}

fn absolute_image(src: &str, base_url: Option<&Url>) -> Option<String> {
    match base_url {
        Some(base) => resolve_http(src, base.as_str()),
        None => Some(src.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;

    const PAGE: &str = r#"
        <html>
        <head>
            <title>Storm Watch | Daily</title>
            <link rel="canonical" href="/weather/storm-watch">
            <meta name="description" content="Meta summary of the storm.">
            <meta property="og:image" content="https://cdn.daily.example/og.jpg">
        </head>
        <body>
            <article class="story">
                <h1>Storm watch issued</h1>
                <p>Forecasters issued a storm watch for the coast, warning of high winds, heavy rain, and flooding in low areas.</p>
                <p>Residents were advised to secure loose objects, charge phones, and avoid travel, officials said on Monday.</p>
            </article>
        </body>
        </html>
    "#;

    fn extractor(fetcher: StaticFetcher) -> ContentExtractor {
        ContentExtractor::new(Arc::new(fetcher), ReadabilityConfig::default())
    }

    #[tokio::test]
    async fn test_extract_full_page() {
        let url = "https://daily.example/amp/storm?ref=rss";
        let extracted = extractor(StaticFetcher::new().with(url, PAGE)).extract(url).await;

        assert!(!extracted.is_error());
        assert_eq!(extracted.canonical_url, "https://daily.example/weather/storm-watch");
        assert_eq!(extracted.title.as_deref(), Some("Storm watch issued"));
        assert!(extracted.main_text.as_deref().unwrap().starts_with("Storm watch issued Forecasters issued"));
        assert!(extracted.rich_html.as_deref().unwrap().contains("<p>Residents were advised"));
        assert!(extracted.excerpt.as_deref().unwrap().starts_with("Forecasters issued a storm watch"));
        assert_eq!(extracted.lead_image_url.as_deref(), Some("https://cdn.daily.example/og.jpg"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_not_raised() {
        let url = "https://daily.example/gone";
        let extracted = extractor(StaticFetcher::new()).extract(url).await;

        assert!(extracted.is_error());
        assert_eq!(extracted.canonical_url, url);
        assert_eq!(extracted.title, None);
        assert_eq!(extracted.main_text, None);
        assert_eq!(extracted.rich_html, None);
        assert!(extracted.extraction_error.unwrap().contains("404"));
    }

    #[test]
    fn test_metadata_fallbacks_for_thin_page() {
        let html = r#"<html><head><title>Only a title</title>
            <meta property="og:description" content="OG summary">
            <meta property="og:image" content="/lead.png"></head><body></body></html>"#;

        let extracted = extractor(StaticFetcher::new()).extract_html("https://x.example/a", html);

        assert!(!extracted.is_error());
        assert_eq!(extracted.canonical_url, "https://x.example/a");
        assert_eq!(extracted.title.as_deref(), Some("Only a title"));
        assert_eq!(extracted.main_text, None);
        assert_eq!(extracted.excerpt.as_deref(), Some("OG summary"));
        assert_eq!(extracted.lead_image_url.as_deref(), Some("https://x.example/lead.png"));
    }

    #[test]
    fn test_small_page_text_is_canonical() {
        let extracted = extractor(StaticFetcher::new())
            .extract_html("https://a.example/x", "<html><body><p>bar\u{a0} body</p></body></html>");
        assert_eq!(extracted.main_text.as_deref(), Some("bar body"));
    }

    #[test]
    fn test_invalid_page_url() {
        let extracted = extractor(StaticFetcher::new()).extract_html("not a url", "<p>x</p>");
        assert!(extracted.is_error());
        assert_eq!(extracted.canonical_url, "not a url");
    }

    #[test]
    fn test_deeply_nested_page_degrades_gracefully() {
        let depth = 20_000;
        let html = format!(
            "<html><body>{}<p>The harbor master confirmed the berth reopened after divers cleared the wreckage, \
             and the first container ship docked before noon.</p>{}</body></html>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );

        let extracted = extractor(StaticFetcher::new()).extract_html("https://deep.example/story", &html);

        assert!(!extracted.is_error());
        assert!(extracted.main_text.as_deref().unwrap().contains("the first container ship docked before noon."));
        assert!(extracted.rich_html.as_deref().unwrap().contains("<p>The harbor master confirmed"));
    }
}
