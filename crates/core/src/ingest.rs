//! One complete ingestion run: validate, fetch, deduplicate, persist, report.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::config::validate_sources;
use crate::control::RunControl;
use crate::dedup::{DedupMerger, SeenFingerprintSet};
use crate::fetch::Fetcher;
use crate::model::{Article, Source};
use crate::pipeline::{IngestionPipeline, PipelineConfig};
use crate::store::PersistenceAdapter;
use crate::summary::RunSummary;
use crate::{LumenError, Result};

/// Everything a finished run knows.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub summary: RunSummary,
    /// Articles the adapter inserted, in encounter order.
    pub stored: Vec<Article>,
    /// The seen-set as it stood at the end of the run.
    pub seen: SeenFingerprintSet,
}

/// Runs the pipeline against a persistence backend.
#[derive(Clone)]
pub struct Ingestor {
    pipeline: IngestionPipeline,
    merger: DedupMerger,
    adapter: Arc<dyn PersistenceAdapter>,
}

impl Ingestor {
    pub fn new(fetcher: Arc<dyn Fetcher>, adapter: Arc<dyn PersistenceAdapter>, config: PipelineConfig) -> Self {
        Self { pipeline: IngestionPipeline::new(fetcher, config), merger: DedupMerger::new(), adapter }
    }

    /// Run and return only the summary.
    pub async fn run(&self, sources: &[Source], control: &RunControl) -> Result<RunSummary> {
        Ok(self.run_detailed(sources, control).await?.summary)
    }

    /// Run over `sources`.
    ///
    /// Fails only with a configuration error, before anything is fetched: an empty
    /// or all-inactive source list, or a backend that cannot list its fingerprints.
    /// Every other problem is recorded in the summary.
    pub async fn run_detailed(&self, sources: &[Source], control: &RunControl) -> Result<IngestOutcome> {
        let started_at = OffsetDateTime::now_utc();
        validate_sources(sources)?;

        let known = self
            .adapter
            .load_known_fingerprints()
            .await
            .map_err(|e| LumenError::Config(format!("cannot load known fingerprints: {}", e)))?;
        let seen = SeenFingerprintSet::seeded(known, started_at);

        let active = sources.iter().filter(|s| s.active).count();
        tracing::info!(sources = active, known = seen.len(), "ingestion run started");

        let output = self.pipeline.run(sources, control).await;
        let merged = self.merger.merge(output.articles, seen);
        let mut seen = merged.seen;
        let report = self.merger.persist(merged.accepted, self.adapter.as_ref(), &mut seen).await;

        let mut summary = RunSummary::new(started_at);
        summary.sources_attempted = output.counters.sources_attempted;
        summary.sources_failed = output.counters.sources_failed;
        summary.entries_fetched = output.counters.entries_fetched;
        summary.extraction_errors = output.counters.extraction_errors;
        summary.articles_accepted = report.stored.len();
        summary.duplicates_skipped = merged.rejected_duplicates + report.conflicts;
        summary.persistence_errors = report.failures.len();
        summary.cancelled = output.cancelled;
        summary.failures = output.failures;
        summary.failures.extend(report.failures);
        summary.finished_at = OffsetDateTime::now_utc();

        tracing::info!(
            attempted = summary.sources_attempted,
            failed = summary.sources_failed,
            fetched = summary.entries_fetched,
            accepted = summary.articles_accepted,
            duplicates = summary.duplicates_skipped,
            persistence_errors = summary.persistence_errors,
            cancelled = summary.cancelled,
            "ingestion run finished"
        );

        Ok(IngestOutcome { summary, stored: report.stored, seen })
    }
}
