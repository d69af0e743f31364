//! Reading every source's feed and turning its entries into fingerprinted articles.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use time::OffsetDateTime;

use crate::assemble::assemble_article;
use crate::control::RunControl;
use crate::extractor::ContentExtractor;
use crate::feed::FeedReader;
use crate::fetch::Fetcher;
use crate::model::{Article, Source};
use crate::readability::ReadabilityConfig;
use crate::summary::RunFailure;

/// Tuning for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Feeds, and then pages, fetched at the same time.
    pub concurrency: usize,
    /// Extract at most this many entries of each feed, in feed order.
    pub max_entries_per_source: Option<usize>,
    pub readability: ReadabilityConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 4, max_entries_per_source: None, readability: ReadabilityConfig::default() }
    }
}

/// Counters gathered while producing candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounters {
    /// Sources whose feed fetch ran to completion, successfully or not.
    pub sources_attempted: usize,
    pub sources_failed: usize,
    /// Entries handed to extraction.
    pub entries_fetched: usize,
    pub extraction_errors: usize,
}

/// Everything a run produced before deduplication.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Candidates in source order, then entry order.
    pub articles: Vec<Article>,
    pub failures: Vec<RunFailure>,
    pub counters: PipelineCounters,
    /// Work was abandoned because the run was stopped.
    pub cancelled: bool,
}

/// Drives feed reading, page extraction and article assembly.
#[derive(Clone)]
pub struct IngestionPipeline {
    reader: FeedReader,
    extractor: ContentExtractor,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: PipelineConfig) -> Self {
        Self {
            reader: FeedReader::new(fetcher.clone()),
            extractor: ContentExtractor::new(fetcher, config.readability.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce candidate articles for the active `sources`.
    ///
    /// Never fails: feed and extraction problems are collected into the output.
    /// Once `control` stops the run, pending fetches are dropped and the articles
    /// finished so far are returned.
    pub async fn run(&self, sources: &[Source], control: &RunControl) -> PipelineOutput {
        let fetched_at = OffsetDateTime::now_utc();
        let concurrency = self.config.concurrency.max(1);
        let mut output = PipelineOutput::default();

        let feeds: Vec<_> = stream::iter(sources.iter().filter(|s| s.active))
            .map(|source| async move { (source, control.guard(self.reader.read(source)).await) })
            .buffered(concurrency)
            .boxed()
            .collect()
            .await;

        let mut jobs = Vec::new();
        for (source, result) in feeds {
            match result {
                None => output.cancelled = true,
                Some(Err(e)) => {
                    tracing::warn!(source = %source.id, url = %source.feed_url, error = %e.cause, "feed fetch failed");
                    output.counters.sources_attempted += 1;
                    output.counters.sources_failed += 1;
                    output.failures.push(RunFailure::Feed { source_id: source.id.clone(), cause: e.cause.to_string() });
                }
                Some(Ok(entries)) => {
                    output.counters.sources_attempted += 1;
                    let limit = self.config.max_entries_per_source.unwrap_or(usize::MAX);
                    jobs.extend(entries.into_iter().take(limit).map(|entry| (source, entry)));
                }
            }
        }
        output.counters.entries_fetched = jobs.len();

        let extracted: Vec<_> = stream::iter(jobs)
            .map(|(source, entry)| async move {
                let content = control.guard(self.extractor.extract(&entry.link)).await;
                (source, entry, content)
            })
            .buffered(concurrency)
            .boxed()
            .collect()
            .await;

        for (source, entry, content) in extracted {
            let Some(content) = content else {
                output.cancelled = true;
                continue;
            };

            if let Some(cause) = &content.extraction_error {
                tracing::debug!(source = %source.id, link = %entry.link, error = %cause, "extraction failed");
                output.counters.extraction_errors += 1;
                output.failures.push(RunFailure::Extraction {
                    source_id: source.id.clone(),
                    link: entry.link.clone(),
                    cause: cause.clone(),
                });
            }

            output.articles.push(assemble_article(source, &entry, &content, fetched_at));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::CancelHandle;
    use crate::fetch::StaticFetcher;
    use crate::model::Leaning;

    fn rss(items: &[(&str, &str)]) -> String {
        let items: String = items
            .iter()
            .map(|(title, link)| format!("<item><title>{}</title><link>{}</link></item>", title, link))
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{}</channel></rss>"#, items)
    }

    fn page(body: &str) -> String {
        format!("<html><body><p>{}</p></body></html>", body)
    }

    fn pipeline(fetcher: StaticFetcher, config: PipelineConfig) -> IngestionPipeline {
        IngestionPipeline::new(Arc::new(fetcher), config)
    }

    #[tokio::test]
    async fn test_order_is_source_then_entry() {
        let fetcher = StaticFetcher::new()
            .with("https://a.example/rss", rss(&[("A1", "https://a.example/1"), ("A2", "https://a.example/2")]))
            .with("https://b.example/rss", rss(&[("B1", "https://b.example/1")]))
            .with("https://a.example/1", page("one"))
            .with("https://a.example/2", page("two"))
            .with("https://b.example/1", page("three"));
        let sources = vec![
            Source::new("a", "A", "https://a.example/rss", Leaning::Left),
            Source::new("b", "B", "https://b.example/rss", Leaning::Right),
        ];

        let config = PipelineConfig { concurrency: 3, ..Default::default() };
        let output = pipeline(fetcher, config).run(&sources, &RunControl::new()).await;

        let titles: Vec<_> = output.articles.iter().map(|a| a.title.as_deref().unwrap()).collect();
        assert_eq!(titles, vec!["A1", "A2", "B1"]);
        assert_eq!(output.articles[2].content.as_deref(), Some("three"));
        assert_eq!(output.counters.sources_attempted, 2);
        assert_eq!(output.counters.entries_fetched, 3);
        assert!(output.failures.is_empty());
        assert!(!output.cancelled);

        let fetched_at = output.articles[0].fetched_at;
        assert!(output.articles.iter().all(|a| a.fetched_at == fetched_at));
    }

    #[tokio::test]
    async fn test_inactive_sources_are_skipped() {
        let mut inactive = Source::new("a", "A", "https://a.example/rss", Leaning::Left);
        inactive.active = false;

        let output = pipeline(StaticFetcher::new(), PipelineConfig::default())
            .run(&[inactive], &RunControl::new())
            .await;

        assert_eq!(output.counters, PipelineCounters::default());
        assert!(output.failures.is_empty());
    }

    #[tokio::test]
    async fn test_extraction_error_degrades_to_feed_fields() {
        let fetcher = StaticFetcher::new().with(
            "https://a.example/rss",
            r#"<rss version="2.0"><channel><item><title>Foo</title><link>https://a.example/x</link>
               <description>Feed summary</description></item></channel></rss>"#,
        );
        let sources = vec![Source::new("a", "A", "https://a.example/rss", Leaning::Center)];

        let output = pipeline(fetcher, PipelineConfig::default()).run(&sources, &RunControl::new()).await;

        assert_eq!(output.counters.extraction_errors, 1);
        assert_eq!(output.articles.len(), 1);
        assert_eq!(output.articles[0].content.as_deref(), Some("Feed summary"));
        assert_eq!(output.articles[0].canonical_url, "https://a.example/x");
        assert!(matches!(&output.failures[..], [RunFailure::Extraction { link, .. }] if link == "https://a.example/x"));
    }

    #[tokio::test]
    async fn test_entry_cap() {
        let fetcher = StaticFetcher::new().with(
            "https://a.example/rss",
            rss(&[("1", "https://a.example/1"), ("2", "https://a.example/2"), ("3", "https://a.example/3")]),
        );
        let sources = vec![Source::new("a", "A", "https://a.example/rss", Leaning::Center)];
        let config = PipelineConfig { max_entries_per_source: Some(2), ..Default::default() };

        let output = pipeline(fetcher, config).run(&sources, &RunControl::new()).await;

        assert_eq!(output.counters.entries_fetched, 2);
        assert_eq!(output.articles.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_fetches_nothing() {
        let fetcher = StaticFetcher::new().with("https://a.example/rss", rss(&[("1", "https://a.example/1")]));
        let sources = vec![Source::new("a", "A", "https://a.example/rss", Leaning::Center)];
        let handle = CancelHandle::new();
        handle.cancel();

        let output = pipeline(fetcher, PipelineConfig::default())
            .run(&sources, &RunControl::new().with_cancel(&handle))
            .await;

        assert!(output.cancelled);
        assert!(output.articles.is_empty());
        assert_eq!(output.counters.sources_attempted, 0);
    }
}
