//! The report an ingestion run hands back to whoever triggered it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A recovered failure, kept so operators can see what a run skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunFailure {
    /// A source whose feed could not be fetched or parsed.
    #[serde(rename_all = "camelCase")]
    Feed { source_id: String, cause: String },
    /// An entry whose page could not be fetched or read. The article was still assembled.
    #[serde(rename_all = "camelCase")]
    Extraction { source_id: String, link: String, cause: String },
    /// An article the persistence adapter rejected.
    #[serde(rename_all = "camelCase")]
    Persistence { fingerprint: String, link: String, cause: String },
}

/// Counts and failures of one run.
///
/// `articles_accepted + duplicates_skipped + persistence_errors` equals the number
/// of assembled candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub entries_fetched: usize,
    pub articles_accepted: usize,
    pub duplicates_skipped: usize,
    pub extraction_errors: usize,
    pub persistence_errors: usize,
    /// The run was stopped by its deadline or a cancel request.
    pub cancelled: bool,
    pub failures: Vec<RunFailure>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

impl RunSummary {
    /// An empty summary for a run starting at `started_at`.
    pub fn new(started_at: OffsetDateTime) -> Self {
        Self {
            sources_attempted: 0,
            sources_failed: 0,
            entries_fetched: 0,
            articles_accepted: 0,
            duplicates_skipped: 0,
            extraction_errors: 0,
            persistence_errors: 0,
            cancelled: false,
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    /// Articles that made it to storage or were found to be duplicates.
    pub fn candidates(&self) -> usize {
        self.articles_accepted + self.duplicates_skipped + self.persistence_errors
    }

    /// One-line description for logs and terminal output.
    pub fn headline(&self) -> String {
        format!(
            "Fetched {} items, {} new saved, {} duplicates, {} failed sources",
            self.entries_fetched, self.articles_accepted, self.duplicates_skipped, self.sources_failed
        )
    }
}
