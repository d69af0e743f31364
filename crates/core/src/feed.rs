//! RSS and Atom feed reading.
//!
//! [`parse_feed`] turns a feed document into [`FeedEntry`] stubs; [`FeedReader`]
//! adds the fetch and wraps failures in a [`FeedError`] so one broken source
//! never takes its siblings down with it.
//!
//! Three document shapes are recognized by their root element: RSS 2.0 (`<rss>`),
//! RSS 1.0 (`<rdf:RDF>`) and Atom (`<feed>`).

use std::fmt;
use std::sync::{Arc, LazyLock};

use quick_xml::Reader;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use regex::Regex;
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, Rfc2822, Rfc3339};

use crate::fetch::Fetcher;
use crate::model::{FeedEntry, Source};
use crate::text::{html_to_plain, non_blank};
use crate::{LumenError, Result};

/// Element text, ignoring any attributes on the element.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

impl TextNode {
    fn text(node: Option<TextNode>) -> Option<String> {
        non_blank(node.and_then(|n| n.value))
    }

    /// First non-blank value of an element that may repeat.
    fn first(nodes: Vec<TextNode>) -> Option<String> {
        nodes.into_iter().find_map(|n| non_blank(n.value))
    }
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    title: Option<TextNode>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// RSS 1.0 keeps its items beside the channel rather than inside it.
#[derive(Debug, Deserialize)]
struct RdfDocument {
    channel: Option<RssChannel>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// Elements that real feeds repeat within one item are collected as lists.
#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<TextNode>,
    #[serde(rename = "guid", default)]
    guids: Vec<TextNode>,
    #[serde(rename = "pubDate", default)]
    pub_dates: Vec<TextNode>,
    #[serde(rename = "dc:date", alias = "date", default)]
    dc_dates: Vec<TextNode>,
    description: Option<TextNode>,
    #[serde(rename = "content:encoded", alias = "encoded")]
    content_encoded: Option<TextNode>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<RssEnclosure>,
}

#[derive(Debug, Deserialize)]
struct RssEnclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<TextNode>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    id: Option<TextNode>,
    published: Option<TextNode>,
    updated: Option<TextNode>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Feed document format, detected from the root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

/// A parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Channel or feed title, if the document declares one.
    pub title: Option<String>,
    /// Entries in document order, already filtered to those with an identity.
    pub entries: Vec<FeedEntry>,
}

/// A feed that could not be fetched or parsed.
#[derive(Debug)]
pub struct FeedError {
    pub source_id: String,
    pub feed_url: String,
    pub cause: LumenError,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed {} ({}) failed: {}", self.source_id, self.feed_url, self.cause)
    }
}

impl std::error::Error for FeedError {}

/// Fetches and parses the feed of a single source.
#[derive(Clone)]
pub struct FeedReader {
    fetcher: Arc<dyn Fetcher>,
}

impl FeedReader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Read `source`'s feed.
    ///
    /// Network, HTTP status and parse failures come back as a [`FeedError`]; the
    /// caller treats that source as having contributed no entries.
    pub async fn read(&self, source: &Source) -> std::result::Result<Vec<FeedEntry>, FeedError> {
        let wrap = |cause| FeedError { source_id: source.id.clone(), feed_url: source.feed_url.clone(), cause };

        let body = self.fetcher.fetch_text(&source.feed_url).await.map_err(wrap)?;
        let parsed = parse_feed(&body).map_err(wrap)?;

        tracing::debug!(source = %source.id, entries = parsed.entries.len(), "feed parsed");
        Ok(parsed.entries)
    }
}

/// Detect the feed format from the document's root element.
pub fn detect_format(xml: &str) -> Result<FeedFormat> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                let local = name.rsplit(':').next().unwrap_or(name.as_str());
                return match local {
                    "rss" => Ok(FeedFormat::Rss),
                    "rdf" => Ok(FeedFormat::Rdf),
                    "feed" => Ok(FeedFormat::Atom),
                    other => Err(LumenError::FeedParseError(format!(
                        "unrecognized root element <{}> (expected rss, rdf:RDF or feed)",
                        other
                    ))),
                };
            }
            Ok(Event::Eof) => return Err(LumenError::FeedParseError("document has no root element".to_string())),
            Err(e) => return Err(LumenError::FeedParseError(e.to_string())),
            Ok(_) => {}
        }
    }
}

/// Parse an RSS or Atom document.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let xml = scrub_html_entities_for_xml(xml.trim_start_matches('\u{feff}'));

    match detect_format(&xml)? {
        FeedFormat::Rss => {
            let doc: RssDocument = from_str(&xml)?;
            Ok(ParsedFeed {
                title: TextNode::text(doc.channel.title),
                entries: doc.channel.items.into_iter().filter_map(rss_entry).collect(),
            })
        }
        FeedFormat::Rdf => {
            let doc: RdfDocument = from_str(&xml)?;
            Ok(ParsedFeed {
                title: doc.channel.and_then(|c| TextNode::text(c.title)),
                entries: doc.items.into_iter().filter_map(rss_entry).collect(),
            })
        }
        FeedFormat::Atom => {
            let doc: AtomFeed = from_str(&xml)?;
            Ok(ParsedFeed {
                title: TextNode::text(doc.title),
                entries: doc.entries.into_iter().filter_map(atom_entry).collect(),
            })
        }
    }
}

fn rss_entry(item: RssItem) -> Option<FeedEntry> {
    let link = TextNode::first(item.links).or_else(|| TextNode::first(item.guids))?;

    let iso = TextNode::first(item.dc_dates).and_then(|d| parse_iso8601(&d));
    let legacy = || TextNode::first(item.pub_dates).and_then(|d| parse_rfc2822(&d));

    let inline_content = TextNode::text(item.content_encoded);
    let snippet = snippet_from(TextNode::text(item.description).as_deref(), inline_content.as_deref());

    Some(FeedEntry {
        title: TextNode::text(item.title).map(|t| html_to_plain(&t)).filter(|t| !t.is_empty()),
        link,
        published_at: iso.or_else(legacy),
        inline_content,
        snippet,
        enclosure_url: item.enclosures.into_iter().find_map(|e| non_blank(e.url)),
    })
}

fn atom_entry(entry: AtomEntry) -> Option<FeedEntry> {
    let alternate = entry
        .links
        .iter()
        .filter(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .find_map(|l| non_blank(l.href.clone()));
    let any_link = || {
        entry
            .links
            .iter()
            .filter(|l| !matches!(l.rel.as_deref(), Some("enclosure") | Some("self")))
            .find_map(|l| non_blank(l.href.clone()))
    };
    let enclosure_url =
        entry.links.iter().filter(|l| l.rel.as_deref() == Some("enclosure")).find_map(|l| non_blank(l.href.clone()));

    let link = alternate.or_else(any_link).or_else(|| TextNode::text(entry.id))?;

    let published_at = TextNode::text(entry.published)
        .and_then(|d| parse_iso8601(&d))
        .or_else(|| TextNode::text(entry.updated).and_then(|d| parse_iso8601(&d)));

    let inline_content = TextNode::text(entry.content);
    let snippet = snippet_from(TextNode::text(entry.summary).as_deref(), inline_content.as_deref());

    Some(FeedEntry {
        title: TextNode::text(entry.title).map(|t| html_to_plain(&t)).filter(|t| !t.is_empty()),
        link,
        published_at,
        inline_content,
        snippet,
        enclosure_url,
    })
}

fn snippet_from(summary: Option<&str>, inline_content: Option<&str>) -> Option<String> {
    summary
        .or(inline_content)
        .map(html_to_plain)
        .filter(|s| !s.is_empty())
}

/// Parse an ISO-8601 / RFC 3339 timestamp.
pub fn parse_iso8601(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    OffsetDateTime::parse(s, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
        .ok()
}

/// Parse an RFC 822 / RFC 2822 `pubDate`, tolerating textual UTC zone names.
pub fn parse_rfc2822(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return Some(dt);
    }

    let normalized = ["GMT", "UTC", "UT", "Z"]
        .iter()
        .find_map(|zone| s.strip_suffix(zone).map(|head| format!("{}+0000", head)))?;
    OffsetDateTime::parse(&normalized, &Rfc2822).ok()
}

static ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

/// Replace HTML named entities that XML does not define.
///
/// Real feeds routinely contain `&nbsp;` or `&mdash;` outside CDATA, which a strict
/// XML parser rejects. Known entities are decoded to their character; unknown
/// ones are escaped so they survive as literal text. CDATA sections are copied
/// untouched.
fn scrub_html_entities_for_xml(s: &str) -> String {
    const CDATA_OPEN: &str = "<![CDATA[";
    const CDATA_CLOSE: &str = "]]>";

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find(CDATA_OPEN) {
        out.push_str(&scrub_entities(&rest[..start]));
        let section = &rest[start..];
        let end = section.find(CDATA_CLOSE).map_or(section.len(), |i| i + CDATA_CLOSE.len());
        out.push_str(&section[..end]);
        rest = &section[end..];
    }
    out.push_str(&scrub_entities(rest));
    out
}

fn scrub_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
                return caps[0].to_string();
            }
            let decoded = html_escape::decode_html_entities(&caps[0]).into_owned();
            if decoded == caps[0] || decoded.contains(['<', '&']) { format!("&amp;{};", name) } else { decoded }
        })
        .into_owned()
}
