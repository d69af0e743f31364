//! Readable-content detection.
//!
//! The heuristic follows the classic readability approach:
//!
//! 1. Paragraph-level blocks are scored by length and comma count.
//! 2. Each score is added in full to the block's parent and at half weight to its
//!    grandparent. A node touched for the first time starts from its tag and
//!    class/id prior.
//! 3. Accumulated scores are discounted by link density, and the best node wins.
//! 4. Siblings of the winner that score well, or read like prose, are kept with it.
//!
//! [`Readability::extract`] runs over a [`DomTree`] and does no I/O, so it can be
//! driven with hand-built trees. [`Readability::parse`] adds preprocessing and
//! parsing of raw HTML.
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{Readability, ReadabilityConfig};
//!
//! let html = "<html><body><article><p>One, two, three, four. Enough prose to score, with commas.</p></article></body></html>";
//! let reader = Readability::with_config(ReadabilityConfig::builder().min_score(5.0).build());
//! let readable = reader.parse(html, None).unwrap();
//! assert!(readable.text.contains("Enough prose"));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use url::Url;

use crate::dom_tree::{DomTree, NodeId, is_block};
use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::scoring::{ScoreConfig, apply_link_penalty, link_density, node_prior, paragraph_score};
use crate::text::{collapse_whitespace, truncate_chars};
use crate::{LumenError, Result};

/// Tags scored as paragraphs wherever they appear.
const PARAGRAPH_TAGS: &[&str] = &["p", "pre"];

/// Tags scored as paragraphs when they hold no block-level children.
const TEXT_CONTAINER_TAGS: &[&str] = &["div", "section", "article", "main", "td", "blockquote"];

/// Paragraph excerpts shorter than this are not considered a summary.
const MIN_EXCERPT_CHARS: usize = 50;

/// Configuration for the readability heuristic.
///
/// ```rust
/// use lumen_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(25.0)
///     .char_threshold(400)
///     .excerpt_len(200)
///     .build();
/// assert_eq!(config.excerpt_len, 200);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the best candidate needs (default: 20.0).
    pub min_score: f64,

    /// Minimum character count for valid content (default: 500). Blocks shorter
    /// than a twentieth of it are not scored.
    pub char_threshold: usize,

    /// Number of top candidates considered as siblings of the winner (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum paragraph blocks to score (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Siblings scoring at least this fraction of the winner are kept (default: 0.2).
    pub sibling_threshold: f64,

    /// Maximum excerpt length in characters (default: 300).
    pub excerpt_len: usize,

    /// Use the whole body when no candidate reaches `min_score` (default: true).
    pub body_fallback: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            char_threshold: 500,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            sibling_threshold: 0.2,
            excerpt_len: 300,
            body_fallback: true,
        }
    }
}

impl ReadabilityConfig {
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for ReadabilityConfig.
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the maximum blocks to score.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets the sibling score threshold.
    pub fn sibling_threshold(mut self, value: f64) -> Self {
        self.config.sibling_threshold = value;
        self
    }

    /// Sets the maximum excerpt length.
    pub fn excerpt_len(mut self, value: usize) -> Self {
        self.config.excerpt_len = value;
        self
    }

    /// Sets whether to fall back to the whole body.
    pub fn body_fallback(mut self, value: bool) -> Self {
        self.config.body_fallback = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The readable part of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Readable {
    /// First non-empty `h1`, preferring one inside the selected content.
    pub title: Option<String>,
    /// Plain text of the selected content, whitespace not yet canonicalized.
    pub text: String,
    /// Serialized markup of the selected content.
    pub html: String,
    /// First substantial paragraph of the selected content.
    pub excerpt: Option<String>,
    /// First image in the selected content.
    pub lead_image: Option<String>,
    /// Score of the winning candidate (0.0 when there was none).
    pub top_score: f64,
    /// Number of top-level elements kept.
    pub element_count: usize,
    /// Whether the whole body was used because no candidate qualified.
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    node: NodeId,
    score: f64,
}

/// Readability engine.
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
    score_config: ScoreConfig,
}

impl Readability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config, score_config: ScoreConfig::default() }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Preprocess and parse `html`, then extract its readable content.
    ///
    /// With a `base_url`, relative links and image sources are made absolute first.
    ///
    /// # Errors
    ///
    /// [`LumenError::NoContent`] when the page has no text at all;
    /// [`LumenError::NotReadable`] when no candidate qualifies and body fallback is off.
    pub fn parse(&self, html: &str, base_url: Option<&Url>) -> Result<Readable> {
        let config = PreprocessConfig { base_url: base_url.cloned(), ..Default::default() };
        let cleaned = preprocess_html(html, &config);
        self.extract(&DomTree::from_html(&cleaned))
    }

    /// Extract readable content from an already-built tree.
    pub fn extract(&self, tree: &DomTree) -> Result<Readable> {
        let scope = tree.body().unwrap_or(tree.root());
        let mut candidates = self.score_candidates(tree, scope);

        candidates.sort_by(|a, b| compare_candidates(tree, b, a));
        let best = candidates.first().copied();

        match best {
            Some(top) if top.score >= self.config.min_score => {
                candidates.truncate(self.config.nb_top_candidates.max(1));
                let nodes = self.select_with_siblings(tree, top, &candidates);
                Ok(self.assemble(tree, &nodes, scope, top.score, false))
            }
            _ => {
                let top_score = best.map(|c| c.score).unwrap_or(0.0);
                if tree.text_len(scope) == 0 {
                    return Err(LumenError::NoContent);
                }
                if !self.config.body_fallback {
                    return Err(LumenError::NotReadable { score: top_score, threshold: self.config.min_score });
                }

                let nodes: Vec<NodeId> = tree.children(scope).to_vec();
                Ok(self.assemble(tree, &nodes, scope, top_score, true))
            }
        }
    }

    /// Score paragraph blocks and propagate to their ancestors.
    fn score_candidates(&self, tree: &DomTree, scope: NodeId) -> Vec<Candidate> {
        let min_chars = self.config.char_threshold / 20;
        let limit = match self.config.max_elems_to_parse {
            0 => usize::MAX,
            n => n,
        };

        let mut scores: HashMap<NodeId, f64> = HashMap::new();
        let paragraphs = tree
            .descendants(scope)
            .into_iter()
            .filter(|n| is_paragraph_block(tree, *n))
            .take(limit);

        for paragraph in paragraphs {
            let text = tree.text(paragraph);
            if collapse_whitespace(&text).chars().count() < min_chars {
                continue;
            }

            let score = paragraph_score(&text, &self.score_config);
            let Some(parent) = tree.parent(paragraph).filter(|p| tree.tag(*p).is_some()) else {
                continue;
            };

            *scores.entry(parent).or_insert_with(|| node_prior(tree, parent, &self.score_config)) += score;

            if let Some(grandparent) = tree.parent(parent).filter(|g| tree.tag(*g).is_some()) {
                *scores.entry(grandparent).or_insert_with(|| node_prior(tree, grandparent, &self.score_config)) +=
                    score / 2.0;
            }
        }

        scores
            .into_iter()
            .map(|(node, score)| Candidate { node, score: apply_link_penalty(tree, node, score, &self.score_config) })
            .collect()
    }

    /// The winner plus qualifying siblings, in document order.
    fn select_with_siblings(&self, tree: &DomTree, top: Candidate, candidates: &[Candidate]) -> Vec<NodeId> {
        let Some(parent) = tree.parent(top.node) else {
            return vec![top.node];
        };

        let threshold = (top.score * self.config.sibling_threshold).max(10.0);

        tree.child_elements(parent)
            .filter(|sibling| {
                if *sibling == top.node {
                    return true;
                }
                if candidates.iter().any(|c| c.node == *sibling && c.score >= threshold) {
                    return true;
                }
                tree.tag(*sibling) == Some("p") && reads_like_prose(tree, *sibling)
            })
            .collect()
    }

    fn assemble(&self, tree: &DomTree, nodes: &[NodeId], scope: NodeId, top_score: f64, used_fallback: bool) -> Readable {
        let html = match nodes {
            [single] if !used_fallback => tree.outer_html(*single),
            _ => format!("<div>{}</div>", nodes.iter().map(|n| tree.outer_html(*n)).collect::<String>()),
        };
        let text = nodes.iter().map(|n| tree.text(*n)).collect::<Vec<_>>().join(" ");

        let within = |tag: &'static str| {
            nodes
                .iter()
                .flat_map(|n| std::iter::once(*n).chain(tree.descendants(*n)))
                .filter(move |d| tree.tag(*d) == Some(tag))
        };

        let non_blank_text = |node: NodeId| Some(collapse_whitespace(&tree.text(node))).filter(|t| !t.is_empty());

        let title = within("h1")
            .find_map(non_blank_text)
            .or_else(|| tree.find_all(scope, "h1").into_iter().find_map(non_blank_text));

        let excerpt = within("p")
            .filter_map(non_blank_text)
            .find(|t| t.chars().count() >= MIN_EXCERPT_CHARS)
            .map(|t| truncate_chars(&t, self.config.excerpt_len));

        let lead_image = within("img")
            .filter_map(|img| tree.attr(img, "src"))
            .map(str::trim)
            .find(|src| !src.is_empty() && !src.starts_with("data:"))
            .map(str::to_string);

        Readable {
            title,
            text,
            html,
            excerpt,
            lead_image,
            top_score,
            element_count: nodes.len(),
            used_fallback,
        }
    }
}

fn is_paragraph_block(tree: &DomTree, node: NodeId) -> bool {
    match tree.tag(node) {
        Some(tag) if PARAGRAPH_TAGS.contains(&tag) => true,
        Some(tag) if TEXT_CONTAINER_TAGS.contains(&tag) => {
            !tree.child_elements(node).any(|c| tree.tag(c).is_some_and(is_block))
        }
        _ => false,
    }
}

/// A paragraph sibling worth keeping even without a score of its own.
fn reads_like_prose(tree: &DomTree, node: NodeId) -> bool {
    let text = collapse_whitespace(&tree.text(node));
    let len = text.chars().count();
    let density = link_density(tree, node);

    (len > 80 && density < 0.25) || (len > 0 && density == 0.0 && text.ends_with('.'))
}

fn candidate_priority(tag: Option<&str>) -> u8 {
    match tag {
        Some("article" | "main" | "section") => 3,
        Some("div") => 2,
        _ => 1,
    }
}

/// Order by score, then tag priority, then text length, then earlier in the document.
fn compare_candidates(tree: &DomTree, a: &Candidate, b: &Candidate) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| candidate_priority(tree.tag(a.node)).cmp(&candidate_priority(tree.tag(b.node))))
        .then_with(|| tree.text_len(a.node).cmp(&tree.text_len(b.node)))
        .then_with(|| b.node.cmp(&a.node))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r##"
        <!DOCTYPE html>
        <html lang="en">
        <head><title>Harbor reopens | The Daily</title></head>
        <body>
            <nav><a href="/">Home</a> <a href="/world">World</a></nav>
            <div class="layout">
                <article>
                    <h1>Harbor reopens after storm</h1>
                    <img src="/img/harbor.jpg" alt="">
                    <p>The city harbor reopened on Tuesday morning, three days after the surge flooded the docks,
                    the warehouses, and the ferry terminal on the north shore.</p>
                    <p>Port officials said cargo traffic would resume gradually, with priority given to fuel,
                    food, and medical supplies, while the damaged cranes are inspected.</p>
                    <p>Ferry service to the islands, suspended since Saturday, is expected to restart on Thursday,
                    weather permitting, according to the operator.</p>
                </article>
                <div class="sidebar"><p>Most read today</p></div>
            </div>
            <footer>Copyright The Daily</footer>
        </body>
        </html>
    "##;

    #[test]
    fn test_readability_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.min_score, 20.0);
        assert_eq!(config.char_threshold, 500);
        assert_eq!(config.nb_top_candidates, 5);
        assert_eq!(config.max_elems_to_parse, 0);
        assert_eq!(config.sibling_threshold, 0.2);
        assert_eq!(config.excerpt_len, 300);
        assert!(config.body_fallback);
    }

    #[test]
    fn test_readability_config_builder() {
        let config = ReadabilityConfig::builder()
            .min_score(30.0)
            .char_threshold(1000)
            .nb_top_candidates(10)
            .max_elems_to_parse(500)
            .sibling_threshold(0.3)
            .excerpt_len(120)
            .body_fallback(false)
            .build();

        assert_eq!(config.min_score, 30.0);
        assert_eq!(config.char_threshold, 1000);
        assert_eq!(config.nb_top_candidates, 10);
        assert_eq!(config.max_elems_to_parse, 500);
        assert_eq!(config.sibling_threshold, 0.3);
        assert_eq!(config.excerpt_len, 120);
        assert!(!config.body_fallback);
    }

    #[test]
    fn test_parse_article() {
        let base = Url::parse("https://daily.example/news/harbor").unwrap();
        let readable = Readability::new().parse(ARTICLE_HTML, Some(&base)).unwrap();

        assert!(!readable.used_fallback);
        assert!(readable.top_score >= 20.0);
        assert!(readable.html.starts_with("<article>"));
        assert_eq!(readable.title.as_deref(), Some("Harbor reopens after storm"));
        assert_eq!(readable.lead_image.as_deref(), Some("https://daily.example/img/harbor.jpg"));

        assert!(readable.text.contains("Port officials said"));
        assert!(readable.text.contains("Ferry service"));
        assert!(!readable.text.contains("Home"));
        assert!(!readable.text.contains("Most read"));
        assert!(!readable.text.contains("Copyright"));

        let excerpt = readable.excerpt.unwrap();
        assert!(excerpt.starts_with("The city harbor reopened on Tuesday morning"));
        assert!(!excerpt.contains('\n'));
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let reader = Readability::with_config(ReadabilityConfig::builder().excerpt_len(20).build());
        let readable = reader.parse(ARTICLE_HTML, None).unwrap();
        assert_eq!(readable.excerpt.as_deref(), Some("The city harbor reop..."));
    }

    #[test]
    fn test_small_page_falls_back_to_body() {
        let readable = Readability::new().parse("<html><body><p>bar body</p></body></html>", None).unwrap();

        assert!(readable.used_fallback);
        assert_eq!(collapse_whitespace(&readable.text), "bar body");
        assert_eq!(readable.html, "<div><p>bar body</p></div>");
        assert_eq!(readable.title, None);
        assert_eq!(readable.excerpt, None);
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let reader = Readability::with_config(ReadabilityConfig::builder().body_fallback(false).build());
        let result = reader.parse("<html><body><p>bar body</p></body></html>", None);
        assert!(matches!(result, Err(LumenError::NotReadable { threshold, .. }) if threshold == 20.0));
    }

    #[test]
    fn test_empty_document() {
        let result = Readability::new().parse("<html><body>  </body></html>", None);
        assert!(matches!(result, Err(LumenError::NoContent)));

        let result = Readability::new().parse("", None);
        assert!(matches!(result, Err(LumenError::NoContent)));
    }

    #[test]
    fn test_prose_siblings_are_kept() {
        let html = r#"
            <html><body><div id="wrap">
                <div class="story">
                    <p>First paragraph of the story, long enough to count, with commas, many commas, and more.</p>
                    <p>Second paragraph of the story, also long enough, with commas, clauses, and asides.</p>
                </div>
                <p>A closing paragraph that sits outside the story container but clearly belongs to the article text.</p>
                <p>Share this</p>
            </div></body></html>
        "#;

        let readable = Readability::new().parse(html, None).unwrap();
        assert!(readable.text.contains("First paragraph"));
        assert!(readable.text.contains("closing paragraph"));
        assert!(!readable.text.contains("Share this"));
        assert_eq!(readable.element_count, 2);
    }

    #[test]
    fn test_extract_from_hand_built_tree() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let body = tree.append_element(root, "body", &[]);
        let menu = tree.append_element(body, "div", &[("class", "menu")]);
        let link = tree.append_element(menu, "a", &[("href", "/")]);
        tree.append_text(link, "Home, World, Sport, Business, Opinion, Culture, Travel");
        let story = tree.append_element(body, "div", &[("class", "story")]);
        for text in [
            "Paragraph one, with commas, enough, of them.",
            "Paragraph two, with commas, enough, of them.",
        ] {
            let p = tree.append_element(story, "p", &[]);
            tree.append_text(p, text);
        }

        let readable = Readability::new().extract(&tree).unwrap();
        assert!(!readable.used_fallback);
        assert!(readable.html.starts_with(r#"<div class="story">"#));
        assert!(!readable.text.contains("Home"));
    }
}
