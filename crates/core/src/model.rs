//! Records that flow through an ingestion run.
//!
//! [`Source`] is configuration owned by whoever manages the feed list. [`FeedEntry`]
//! is the ephemeral stub a feed yields per item. [`Article`] is the unit handed to
//! persistence; its `fingerprint` is the only deduplication key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::LumenError;

/// Editorial orientation attached to a source and propagated to its articles.
///
/// Lumen treats this as opaque metadata; nothing in the pipeline branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Leaning {
    Left,
    Center,
    Right,
    Independent,
}

impl Leaning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leaning::Left => "left",
            Leaning::Center => "center",
            Leaning::Right => "right",
            Leaning::Independent => "independent",
        }
    }
}

impl fmt::Display for Leaning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Leaning {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            "independent" => Ok(Self::Independent),
            other => Err(LumenError::Config(format!(
                "Invalid leaning: {}. Valid options: left, center, right, independent",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Leaning {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_active() -> bool {
    true
}

/// Configuration for one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier.
    pub id: String,
    /// Display name, copied onto every article from this source.
    pub name: String,
    /// RSS or Atom document URL.
    #[serde(alias = "feedURL", alias = "feedUrl")]
    pub feed_url: String,
    pub leaning: Leaning,
    /// Inactive sources are skipped by a run.
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Source {
    pub fn new(id: impl Into<String>, name: impl Into<String>, feed_url: impl Into<String>, leaning: Leaning) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            feed_url: feed_url.into(),
            leaning,
            active: true,
            description: None,
        }
    }
}

/// One item of a parsed feed.
///
/// `link` is already resolved through the link, guid, id precedence; entries
/// without any of them never become a `FeedEntry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// Markup embedded in the feed (`content:encoded` or Atom `content`).
    pub inline_content: Option<String>,
    /// Plain-text summary with markup stripped.
    pub snippet: Option<String>,
    pub enclosure_url: Option<String>,
}

/// The persisted unit of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source_id: String,
    pub source_name: String,
    pub leaning: Leaning,
    pub title: Option<String>,
    pub link: String,
    #[serde(rename = "canonicalURL")]
    pub canonical_url: String,
    pub content: Option<String>,
    pub html: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_leaning_from_str() {
        assert_eq!("Left".parse::<Leaning>().unwrap(), Leaning::Left);
        assert_eq!(" center ".parse::<Leaning>().unwrap(), Leaning::Center);
        assert_eq!("INDEPENDENT".parse::<Leaning>().unwrap(), Leaning::Independent);
        assert!(matches!("far".parse::<Leaning>(), Err(LumenError::Config(_))));
    }

    #[test]
    fn test_source_defaults_to_active() {
        let source: Source =
            serde_json::from_str(r#"{"id":"a","name":"A","feed_url":"https://a.example/rss","leaning":"right"}"#)
                .unwrap();
        assert!(source.active);
        assert_eq!(source.leaning, Leaning::Right);
        assert_eq!(source.description, None);

        let shouty: Source =
            serde_json::from_str(r#"{"id":"a","name":"A","feed_url":"https://a.example/rss","leaning":"Left"}"#)
                .unwrap();
        assert_eq!(shouty.leaning, Leaning::Left);
    }

    #[test]
    fn test_source_accepts_feed_url_alias() {
        let source: Source = serde_json::from_str(
            r#"{"id":"a","name":"A","feedURL":"https://a.example/rss","leaning":"left","active":false}"#,
        )
        .unwrap();
        assert_eq!(source.feed_url, "https://a.example/rss");
        assert!(!source.active);
    }

    #[test]
    fn test_article_serialization_uses_record_field_names() {
        let article = Article {
            source_id: "a".into(),
            source_name: "A Daily".into(),
            leaning: Leaning::Center,
            title: Some("Foo".into()),
            link: "https://a.example/x".into(),
            canonical_url: "https://a.example/x".into(),
            content: None,
            html: None,
            excerpt: None,
            image: None,
            published_at: None,
            fetched_at: datetime!(2024-05-01 12:00 UTC),
            fingerprint: "abc".into(),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["sourceId"], "a");
        assert_eq!(json["sourceName"], "A Daily");
        assert_eq!(json["leaning"], "center");
        assert_eq!(json["canonicalURL"], "https://a.example/x");
        assert_eq!(json["fetchedAt"], "2024-05-01T12:00:00Z");
        assert!(json["publishedAt"].is_null());

        let back: Article = serde_json::from_value(json).unwrap();
        assert_eq!(back, article);
    }
}
