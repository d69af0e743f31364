use crate::Document;

/// Page-level metadata read from the document head.
///
/// URL-valued fields are resolved against the document's base URL when it has one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// `<link rel="canonical">` target, as written in the page.
    pub canonical_href: Option<String>,
    /// `<title>` text.
    pub title: Option<String>,
    /// `meta[name=description]`, else `og:description`.
    pub description: Option<String>,
    /// `og:image`, else `twitter:image`.
    pub image: Option<String>,
    /// `og:site_name`.
    pub site_name: Option<String>,
}

impl Document {
    /// The `href` of the first `<link rel="canonical">`.
    pub fn canonical_href(&self) -> Option<String> {
        self.select(r#"link[rel~="canonical"][href]"#)
            .ok()?
            .iter()
            .filter_map(|el| el.attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string)
    }

    /// Description with priority fallback:
    /// 1. Meta `description`
    /// 2. Open Graph `og:description`
    /// 3. Twitter `twitter:description`
    pub fn extract_description(&self) -> Option<String> {
        ["description", "og:description", "twitter:description"]
            .iter()
            .find_map(|name| self.get_meta_content(name))
    }

    /// Lead image with priority fallback:
    /// 1. Open Graph `og:image` (or `og:image:url`)
    /// 2. Twitter `twitter:image`
    pub fn extract_image(&self) -> Option<String> {
        let raw = ["og:image", "og:image:url", "twitter:image"]
            .iter()
            .find_map(|name| self.get_meta_content(name))?;
        Some(self.resolve(&raw))
    }

    /// Extract all metadata at once
    pub fn extract_metadata(&self) -> Metadata {
        Metadata {
            canonical_href: self.canonical_href(),
            title: self.title(),
            description: self.extract_description(),
            image: self.extract_image(),
            site_name: self.get_meta_content("og:site_name"),
        }
    }

    /// Resolve `reference` against the base URL, leaving it as-is without one.
    fn resolve(&self, reference: &str) -> String {
        match self.base_url().and_then(|base| base.join(reference).ok()) {
            Some(url) => url.to_string(),
            None => reference.to_string(),
        }
    }

    /// Get trimmed, non-blank meta tag content by name or property attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        for key in ["name", "property"] {
            let selector = format!("meta[{}=\"{}\"]", key, attr);
            if let Ok(elements) = self.select(&selector)
                && let Some(content) = elements.iter().filter_map(|el| el.attr("content")).map(str::trim).next()
                && !content.is_empty()
            {
                return Some(content.to_string());
            }
        }

        None
    }
}
