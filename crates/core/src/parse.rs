//! HTML parsing for page-level lookups.
//!
//! [`Document`] wraps a parsed page and answers CSS selector queries. It is used for
//! head metadata (`<title>`, `<meta>`, `<link rel=canonical>`); the readability
//! heuristic works on [`crate::dom_tree::DomTree`] instead.
//!
//! ```rust
//! use lumen_core::parse::Document;
//!
//! let html = "<html><head><title>Test</title></head><body><p class=\"content\">Hello</p></body></html>";
//! let doc = Document::parse(html);
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.select("p.content").unwrap().len(), 1);
//! ```

use scraper::{Html, Selector};
use url::Url;

use crate::{LumenError, Result};

/// A parsed HTML page, optionally tied to the URL it was fetched from.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses HTML fetched from `url`, used as the base for resolving relative references.
    ///
    /// # Errors
    ///
    /// Returns [`LumenError::InvalidUrl`] if `url` does not parse.
    pub fn parse_with_url(html: &str, url: &str) -> Result<Self> {
        let base_url = Url::parse(url).map_err(|e| LumenError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(Self { html: Html::parse_document(html), base_url: Some(base_url) })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`LumenError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| LumenError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// The trimmed `<title>` text, if present and not blank.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let title = self.html.select(&selector).next()?.text().collect::<String>();
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl Element<'_> {
    /// Concatenated text of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }
}
