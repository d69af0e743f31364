use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{DomTree, NodeId};

/// Configuration for content scoring algorithm
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum content density score from character count
    pub max_char_density_score: f64,
    /// Maximum content density score from comma count
    pub max_comma_density_score: f64,
    /// Characters per point for content density scoring
    pub chars_per_point: usize,
    /// Text length above which a node counts as content-rich and its link penalty is halved
    pub content_rich_chars: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
            content_rich_chars: 500,
        }
    }
}

/// Tag prior for a node that receives propagated paragraph scores.
///
/// - ARTICLE: +10 (primary content container)
/// - SECTION: +8
/// - DIV: +5 (generic container)
/// - TD, BLOCKQUOTE, P: +3
/// - PRE: 0 (code blocks are rarely main content)
/// - FORM, ADDRESS and list elements: -3
/// - headings, TH, HEADER, FOOTER, NAV, ASIDE: -5
pub fn base_tag_score(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "section" => 8.0,
        "div" | "main" => 5.0,
        "td" | "blockquote" | "p" => 3.0,
        "pre" => 0.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => -5.0,
        _ => 0.0,
    }
}

/// Patterns that suggest an element contains main content
pub(crate) static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)").unwrap()
});

/// Patterns that suggest an element does NOT contain main content
pub(crate) static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|share|social)").unwrap()
});

/// Class/ID weight adjustment for `node`.
///
/// The id is checked before the class list; within each, a positive match wins
/// over a negative one.
pub fn class_id_weight(tree: &DomTree, node: NodeId, config: &ScoreConfig) -> f64 {
    if let Some(id) = tree.attr(node, "id") {
        if POSITIVE.is_match(id) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(id) {
            return config.negative_weight;
        }
    }

    if let Some(class) = tree.attr(node, "class") {
        for class_name in class.split_whitespace() {
            if POSITIVE.is_match(class_name) {
                return config.positive_weight;
            }
            if NEGATIVE.is_match(class_name) {
                return config.negative_weight;
            }
        }
    }

    0.0
}

/// Score contributed by a text block: length and commas, each capped.
pub fn content_density_score(text: &str, config: &ScoreConfig) -> f64 {
    let char_count = text.split_whitespace().map(|w| w.chars().count()).sum::<usize>();
    let char_score = ((char_count / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Score of a single paragraph-level block before propagation.
pub fn paragraph_score(text: &str, config: &ScoreConfig) -> f64 {
    1.0 + content_density_score(text, config)
}

/// Ratio of link text to all text below `node`, from 0.0 to 1.0.
pub fn link_density(tree: &DomTree, node: NodeId) -> f64 {
    let text_length = tree.text_len(node);
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length: usize = tree.find_all(node, "a").into_iter().map(|a| tree.text_len(a)).sum();
    (link_text_length as f64 / text_length as f64).min(1.0)
}

/// Initial score for a node that becomes a candidate: tag prior plus class weight.
pub fn node_prior(tree: &DomTree, node: NodeId, config: &ScoreConfig) -> f64 {
    tree.tag(node).map(base_tag_score).unwrap_or(0.0) + class_id_weight(tree, node, config)
}

/// Apply the link density penalty to an accumulated candidate score.
///
/// The penalty is halved for nodes with a positive class/ID or with more text
/// than `content_rich_chars`.
pub fn apply_link_penalty(tree: &DomTree, node: NodeId, score: f64, config: &ScoreConfig) -> f64 {
    let ld = link_density(tree, node);
    let softened = class_id_weight(tree, node, config) > 0.0 || tree.text_len(node) > config.content_rich_chars;

    let penalty = if softened { 1.0 - ld * 0.5 } else { 1.0 - ld };
    score * penalty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(tree: &DomTree, tag: &str) -> NodeId {
        tree.find_first(tree.root(), tag).unwrap()
    }

    #[test]
    fn test_base_tag_score() {
        assert_eq!(base_tag_score("article"), 10.0);
        assert_eq!(base_tag_score("section"), 8.0);
        assert_eq!(base_tag_score("div"), 5.0);
        assert_eq!(base_tag_score("p"), 3.0);
        assert_eq!(base_tag_score("pre"), 0.0);
        assert_eq!(base_tag_score("form"), -3.0);
        assert_eq!(base_tag_score("nav"), -5.0);
        assert_eq!(base_tag_score("span"), 0.0);
    }

    #[test]
    fn test_class_weight_positive() {
        let tree = DomTree::from_html(r#"<div class="article-content">Content</div>"#);
        assert_eq!(class_id_weight(&tree, first(&tree, "div"), &ScoreConfig::default()), 25.0);
    }

    #[test]
    fn test_class_weight_negative() {
        let tree = DomTree::from_html(r#"<div class="sidebar">Content</div>"#);
        assert_eq!(class_id_weight(&tree, first(&tree, "div"), &ScoreConfig::default()), -25.0);
    }

    #[test]
    fn test_class_weight_id_checked_first() {
        let tree = DomTree::from_html(r#"<div id="main-article" class="sidebar">Content</div>"#);
        assert_eq!(class_id_weight(&tree, first(&tree, "div"), &ScoreConfig::default()), 25.0);
    }

    #[test]
    fn test_class_weight_no_match() {
        let tree = DomTree::from_html(r#"<div class="container" id="wrapper">Content</div>"#);
        assert_eq!(class_id_weight(&tree, first(&tree, "div"), &ScoreConfig::default()), 0.0);
    }

    #[test]
    fn test_content_density() {
        let config = ScoreConfig::default();
        assert_eq!(content_density_score("Short text here.", &config), 0.0);
        assert_eq!(content_density_score("Text with commas, more commas, even more, and more.", &config), 3.0);
        assert_eq!(content_density_score(&"a".repeat(150), &config), 1.0);
        assert_eq!(content_density_score(&"a".repeat(900), &config), 3.0);
        assert_eq!(paragraph_score("one, two", &config), 2.0);
    }

    #[test]
    fn test_link_density() {
        let tree = DomTree::from_html(r##"<div id="a">Some text <a href="#">link</a> more</div><p><a href="#">all</a></p><pre>none</pre>"##);

        let density = link_density(&tree, first(&tree, "div"));
        assert!(density > 0.0 && density < 1.0);
        assert_eq!(link_density(&tree, first(&tree, "p")), 1.0);
        assert_eq!(link_density(&tree, first(&tree, "pre")), 0.0);
    }

    #[test]
    fn test_node_prior() {
        let tree = DomTree::from_html(r#"<article class="post">x</article><nav class="menu">y</nav>"#);
        let config = ScoreConfig::default();
        assert_eq!(node_prior(&tree, first(&tree, "article"), &config), 35.0);
        assert_eq!(node_prior(&tree, first(&tree, "nav"), &config), -30.0);
    }

    #[test]
    fn test_link_penalty() {
        let tree = DomTree::from_html(
            r##"<div id="nav-links"><a href="#">Link one</a> <a href="#">Link two</a></div>
                <div class="story"><a href="#">Link one</a> <a href="#">Link two</a></div>"##,
        );
        let config = ScoreConfig::default();
        let divs = tree.find_all(tree.root(), "div");

        assert_eq!(apply_link_penalty(&tree, divs[0], 10.0, &config), 0.0);
        assert_eq!(apply_link_penalty(&tree, divs[1], 10.0, &config), 5.0);
    }
}
