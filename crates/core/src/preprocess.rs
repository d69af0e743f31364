//! Cleanup passes applied to raw page HTML before it is scored.
//!
//! Each pass is a streaming [`lol_html`] rewrite. A pass that fails to rewrite hands
//! back its input unchanged, so preprocessing never loses a page.

use std::borrow::Cow;
use std::sync::LazyLock;

use lol_html::{ElementContentHandlers, HtmlRewriter, Selector, Settings, element};
use regex::Regex;
use url::Url;

use crate::scoring::{NEGATIVE, POSITIVE};

/// Elements removed together with their content.
pub const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "canvas", "nav", "footer", "aside", "form", "template",
];

/// Elements never unwrapped by the unlikely-candidate pass.
const PROTECTED_TAGS: &[&str] = &["html", "body", "article", "main", "a"];

static AD_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[-_])(ad|ads|adv|advert|advertisement|adsbygoogle|adslot|sponsored|dfp)([-_]|\d|$)").unwrap()
});
static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove the elements in [`STRIPPED_TAGS`]
    pub strip_tags: bool,
    /// Whether to remove elements whose class or id marks them as advertising
    pub remove_ads: bool,
    /// Whether to unwrap unlikely candidates (menus, comments, sidebars)
    pub remove_unlikely: bool,
    /// Whether to remove hidden elements
    pub remove_hidden: bool,
    /// Base URL for converting relative URLs; `None` leaves them alone
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { strip_tags: true, remove_ads: true, remove_unlikely: true, remove_hidden: true, base_url: None }
    }
}

/// Preprocess HTML by removing unwanted elements and normalizing the document
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = COMMENT.replace_all(html, "").into_owned();

    if config.strip_tags {
        processed = remove_unwanted_tags(&processed);
    }

    if config.remove_ads {
        processed = remove_ad_elements(&processed);
    }

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed);
    }

    if let Some(base_url) = &config.base_url {
        processed = convert_relative_urls(&processed, base_url);
    }

    processed
}

/// Run `html` through a single rewriter pass.
fn rewrite<'h>(html: &str, handlers: Vec<(Cow<'_, Selector>, ElementContentHandlers<'h>)>) -> String {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    match String::from_utf8(output) {
        Ok(out) if !out.is_empty() => out,
        _ => html.to_string(),
    }
}

fn remove_unwanted_tags(html: &str) -> String {
    let handlers = STRIPPED_TAGS
        .iter()
        .map(|tag| {
            element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();
    rewrite(html, handlers)
}

fn is_ad_marked(id: Option<&str>, class: Option<&str>) -> bool {
    id.is_some_and(|id| AD_MARKER.is_match(id))
        || class.is_some_and(|class| class.split_whitespace().any(|c| AD_MARKER.is_match(c)))
}

fn remove_ad_elements(html: &str) -> String {
    rewrite(
        html,
        vec![element!("*", |el| {
            if !PROTECTED_TAGS.contains(&el.tag_name().as_str())
                && is_ad_marked(el.get_attribute("id").as_deref(), el.get_attribute("class").as_deref())
            {
                el.remove();
            }
            Ok(())
        })],
    )
}

fn is_unlikely(value: &str) -> bool {
    NEGATIVE.is_match(value) && !POSITIVE.is_match(value)
}

/// Unwrap elements whose id or class marks them as page chrome, keeping their content.
fn remove_unlikely_candidates(html: &str) -> String {
    rewrite(
        html,
        vec![element!("*", |el| {
            if PROTECTED_TAGS.contains(&el.tag_name().as_str()) {
                return Ok(());
            }

            let unlikely_id = el.get_attribute("id").is_some_and(|id| is_unlikely(&id));
            let unlikely_class =
                el.get_attribute("class").is_some_and(|class| class.split_whitespace().any(is_unlikely));

            if unlikely_id || unlikely_class {
                el.remove_and_keep_content();
            }
            Ok(())
        })],
    )
}

/// Convert relative URLs to absolute URLs
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let absolutize = |value: &str| base_url.join(value.trim()).ok().map(|u| u.to_string());

    rewrite(
        html,
        vec![
            element!("a[href]", |el| absolutize_attr(el, "href", &absolutize)),
            element!("link[href]", |el| absolutize_attr(el, "href", &absolutize)),
            element!("img[src]", |el| absolutize_attr(el, "src", &absolutize)),
            element!("source[src]", |el| absolutize_attr(el, "src", &absolutize)),
        ],
    )
}

fn absolutize_attr(
    el: &mut lol_html::html_content::Element<'_, '_>, name: &str, absolutize: &impl Fn(&str) -> Option<String>,
) -> lol_html::HandlerResult {
    if let Some(value) = el.get_attribute(name)
        && !value.starts_with("data:")
        && let Some(absolute) = absolutize(&value)
    {
        el.set_attribute(name, &absolute)?;
    }
    Ok(())
}

/// Remove elements hidden by inline style or the `hidden` attribute
fn remove_hidden_elements(html: &str) -> String {
    rewrite(
        html,
        vec![element!("*", |el| {
            let hidden_style = el.get_attribute("style").is_some_and(|style| HIDDEN_STYLE.is_match(&style));
            if hidden_style || el.has_attribute("hidden") {
                el.remove();
            }
            Ok(())
        })],
    )
}
