//! Building an [`Article`] out of a feed entry and its extracted page.
//!
//! Every article field is filled from an ordered chain of origins. The first origin
//! holding a present, non-blank value wins; if none does the field stays absent.

use time::OffsetDateTime;

use crate::extractor::ExtractedContent;
use crate::fingerprint::fingerprint;
use crate::model::{Article, FeedEntry, Source};
use crate::text::html_to_plain;

/// Where a field value can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    FeedTitle,
    FeedSnippet,
    /// The feed's inline markup, reduced to plain text.
    FeedInlineText,
    FeedInlineHtml,
    FeedEnclosure,
    FeedLink,
    ExtractedTitle,
    ExtractedMainText,
    ExtractedHtml,
    ExtractedExcerpt,
    ExtractedLeadImage,
    ExtractedCanonical,
}

impl Origin {
    /// The raw value this origin offers, before the presence check.
    pub fn value(self, entry: &FeedEntry, extracted: &ExtractedContent) -> Option<String> {
        match self {
            Origin::FeedTitle => entry.title.clone(),
            Origin::FeedSnippet => entry.snippet.clone(),
            Origin::FeedInlineText => entry.inline_content.as_deref().map(html_to_plain),
            Origin::FeedInlineHtml => entry.inline_content.clone(),
            Origin::FeedEnclosure => entry.enclosure_url.clone(),
            Origin::FeedLink => Some(entry.link.clone()),
            Origin::ExtractedTitle => extracted.title.clone(),
            Origin::ExtractedMainText => extracted.main_text.clone(),
            Origin::ExtractedHtml => extracted.rich_html.clone(),
            Origin::ExtractedExcerpt => extracted.excerpt.clone(),
            Origin::ExtractedLeadImage => extracted.lead_image_url.clone(),
            Origin::ExtractedCanonical => Some(extracted.canonical_url.clone()),
        }
    }
}

/// An article field filled through a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
    Html,
    Excerpt,
    Image,
    CanonicalUrl,
}

impl Field {
    pub const ALL: [Field; 6] =
        [Field::Title, Field::Content, Field::Html, Field::Excerpt, Field::Image, Field::CanonicalUrl];

    /// Origins to try, highest priority first.
    pub fn chain(self) -> &'static [Origin] {
        match self {
            Field::Title => &[Origin::FeedTitle, Origin::ExtractedTitle],
            Field::Content => &[
                Origin::ExtractedMainText,
                Origin::ExtractedExcerpt,
                Origin::FeedSnippet,
                Origin::FeedInlineText,
            ],
            Field::Html => &[Origin::ExtractedHtml, Origin::FeedInlineHtml],
            Field::Excerpt => &[Origin::ExtractedExcerpt, Origin::FeedSnippet],
            Field::Image => &[Origin::ExtractedLeadImage, Origin::FeedEnclosure],
            Field::CanonicalUrl => &[Origin::ExtractedCanonical, Origin::FeedLink],
        }
    }

    /// The first present value along the chain, with the origin it came from.
    pub fn resolve(self, entry: &FeedEntry, extracted: &ExtractedContent) -> Option<(Origin, String)> {
        self.chain()
            .iter()
            .find_map(|origin| origin.value(entry, extracted).filter(|v| is_present(v)).map(|v| (*origin, v)))
    }

    fn value(self, entry: &FeedEntry, extracted: &ExtractedContent) -> Option<String> {
        self.resolve(entry, extracted).map(|(_, v)| v)
    }
}

/// Present and not blank.
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Assemble and fingerprint one article.
pub fn assemble_article(
    source: &Source, entry: &FeedEntry, extracted: &ExtractedContent, fetched_at: OffsetDateTime,
) -> Article {
    let title = Field::Title.value(entry, extracted);
    let content = Field::Content.value(entry, extracted);
    let canonical_url = Field::CanonicalUrl.value(entry, extracted).unwrap_or_else(|| entry.link.clone());
    let fingerprint = fingerprint(title.as_deref(), content.as_deref(), &entry.link);

    Article {
        source_id: source.id.clone(),
        source_name: source.name.clone(),
        leaning: source.leaning,
        title,
        link: entry.link.clone(),
        canonical_url,
        content,
        html: Field::Html.value(entry, extracted),
        excerpt: Field::Excerpt.value(entry, extracted),
        image: Field::Image.value(entry, extracted),
        published_at: entry.published_at,
        fetched_at,
        fingerprint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Leaning;
    use rstest::rstest;
    use time::macros::datetime;

    const LINK: &str = "https://a.example/x";

    fn source() -> Source {
        Source::new("a", "A Daily", "https://a.example/rss", Leaning::Center)
    }

    fn entry() -> FeedEntry {
        FeedEntry {
            title: Some("Feed title".into()),
            link: LINK.into(),
            published_at: None,
            inline_content: Some("<p>Inline <b>body</b></p>".into()),
            snippet: Some("Feed snippet".into()),
            enclosure_url: Some("https://a.example/enclosure.jpg".into()),
        }
    }

    fn extracted() -> ExtractedContent {
        ExtractedContent {
            canonical_url: "https://a.example/canonical".into(),
            title: Some("Page title".into()),
            main_text: Some("Page main text".into()),
            rich_html: Some("<div>Page html</div>".into()),
            excerpt: Some("Page excerpt".into()),
            lead_image_url: Some("https://a.example/lead.jpg".into()),
            extraction_error: None,
        }
    }

    fn empty_entry() -> FeedEntry {
        FeedEntry { link: LINK.into(), ..Default::default() }
    }

    fn failed_extraction() -> ExtractedContent {
        ExtractedContent { canonical_url: LINK.into(), extraction_error: Some("HTTP 404".into()), ..Default::default() }
    }

    #[rstest]
    #[case::feed_title_wins(Field::Title, entry(), extracted(), Some(Origin::FeedTitle))]
    #[case::extracted_title_when_feed_blank(
        Field::Title,
        FeedEntry { title: Some("  ".into()), ..entry() },
        extracted(),
        Some(Origin::ExtractedTitle)
    )]
    #[case::no_title(Field::Title, empty_entry(), failed_extraction(), None)]
    #[case::main_text_wins(Field::Content, entry(), extracted(), Some(Origin::ExtractedMainText))]
    #[case::excerpt_when_no_main_text(
        Field::Content,
        entry(),
        ExtractedContent { main_text: None, ..extracted() },
        Some(Origin::ExtractedExcerpt)
    )]
    #[case::snippet_when_extraction_failed(Field::Content, entry(), failed_extraction(), Some(Origin::FeedSnippet))]
    #[case::inline_text_last(
        Field::Content,
        FeedEntry { snippet: None, ..entry() },
        failed_extraction(),
        Some(Origin::FeedInlineText)
    )]
    #[case::no_content(Field::Content, empty_entry(), failed_extraction(), None)]
    #[case::rich_html_wins(Field::Html, entry(), extracted(), Some(Origin::ExtractedHtml))]
    #[case::inline_html_fallback(Field::Html, entry(), failed_extraction(), Some(Origin::FeedInlineHtml))]
    #[case::no_html(Field::Html, empty_entry(), failed_extraction(), None)]
    #[case::extracted_excerpt_wins(Field::Excerpt, entry(), extracted(), Some(Origin::ExtractedExcerpt))]
    #[case::snippet_excerpt(Field::Excerpt, entry(), failed_extraction(), Some(Origin::FeedSnippet))]
    #[case::no_excerpt(Field::Excerpt, empty_entry(), failed_extraction(), None)]
    #[case::lead_image_wins(Field::Image, entry(), extracted(), Some(Origin::ExtractedLeadImage))]
    #[case::enclosure_image(Field::Image, entry(), failed_extraction(), Some(Origin::FeedEnclosure))]
    #[case::no_image(Field::Image, empty_entry(), failed_extraction(), None)]
    #[case::extracted_canonical(Field::CanonicalUrl, entry(), extracted(), Some(Origin::ExtractedCanonical))]
    #[case::blank_canonical_uses_link(
        Field::CanonicalUrl,
        entry(),
        ExtractedContent { canonical_url: " ".into(), ..extracted() },
        Some(Origin::FeedLink)
    )]
    fn test_fallback_chain(
        #[case] field: Field, #[case] entry: FeedEntry, #[case] extracted: ExtractedContent,
        #[case] expected: Option<Origin>,
    ) {
        let resolved = field.resolve(&entry, &extracted).map(|(origin, _)| origin);
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_every_chain_is_non_empty() {
        for field in Field::ALL {
            assert!(!field.chain().is_empty(), "{:?}", field);
        }
    }

    #[test]
    fn test_inline_content_becomes_plain_text() {
        let entry = FeedEntry { snippet: None, ..entry() };
        let (_, content) = Field::Content.resolve(&entry, &failed_extraction()).unwrap();
        assert_eq!(content, "Inline body");
    }

    #[test]
    fn test_assemble_article() {
        let fetched_at = datetime!(2024-05-01 12:00 UTC);
        let entry = FeedEntry { published_at: Some(datetime!(2024-04-30 8:00 UTC)), ..entry() };
        let article = assemble_article(&source(), &entry, &extracted(), fetched_at);

        assert_eq!(article.source_id, "a");
        assert_eq!(article.source_name, "A Daily");
        assert_eq!(article.leaning, Leaning::Center);
        assert_eq!(article.title.as_deref(), Some("Feed title"));
        assert_eq!(article.link, LINK);
        assert_eq!(article.canonical_url, "https://a.example/canonical");
        assert_eq!(article.content.as_deref(), Some("Page main text"));
        assert_eq!(article.html.as_deref(), Some("<div>Page html</div>"));
        assert_eq!(article.excerpt.as_deref(), Some("Page excerpt"));
        assert_eq!(article.image.as_deref(), Some("https://a.example/lead.jpg"));
        assert_eq!(article.published_at, entry.published_at);
        assert_eq!(article.fetched_at, fetched_at);
        assert_eq!(article.fingerprint, fingerprint(Some("Feed title"), Some("Page main text"), LINK));
    }

    #[test]
    fn test_degraded_article_keeps_feed_fields() {
        let article =
            assemble_article(&source(), &entry(), &failed_extraction(), datetime!(2024-05-01 12:00 UTC));

        assert_eq!(article.canonical_url, LINK);
        assert_eq!(article.content.as_deref(), Some("Feed snippet"));
        assert_eq!(article.html.as_deref(), Some("<p>Inline <b>body</b></p>"));
        assert_eq!(article.image.as_deref(), Some("https://a.example/enclosure.jpg"));
    }

    #[test]
    fn test_fingerprint_uses_link_not_canonical() {
        let a = assemble_article(&source(), &entry(), &extracted(), datetime!(2024-05-01 12:00 UTC));
        let other_canonical = ExtractedContent { canonical_url: "https://b.example/y".into(), ..extracted() };
        let b = assemble_article(&source(), &entry(), &other_canonical, datetime!(2024-05-02 12:00 UTC));
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}
