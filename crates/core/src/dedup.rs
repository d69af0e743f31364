//! Partitioning candidates into new and already-seen articles, and persisting the new ones.

use std::collections::HashMap;

use time::OffsetDateTime;

use crate::model::Article;
use crate::store::{PersistenceAdapter, UpsertOutcome};
use crate::summary::RunFailure;

/// What is known about a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenEntry {
    pub first_seen: OffsetDateTime,
    /// The adapter's identifier for the stored record, once it has one.
    pub record_ref: Option<String>,
}

/// Fingerprints known to a run.
///
/// Seeded from the adapter when a run starts and only ever grown afterwards.
/// Fingerprints inserted after seeding make up the delta.
#[derive(Debug, Clone, Default)]
pub struct SeenFingerprintSet {
    entries: HashMap<String, SeenEntry>,
    delta: Vec<String>,
}

impl SeenFingerprintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding `known` fingerprints, none of which count toward the delta.
    pub fn seeded(known: impl IntoIterator<Item = String>, at: OffsetDateTime) -> Self {
        let entries = known
            .into_iter()
            .map(|fp| (fp, SeenEntry { first_seen: at, record_ref: None }))
            .collect();
        Self { entries, delta: Vec::new() }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn get(&self, fingerprint: &str) -> Option<&SeenEntry> {
        self.entries.get(fingerprint)
    }

    /// Insert `fingerprint` if it is new. Returns whether it was.
    pub fn insert(&mut self, fingerprint: &str, at: OffsetDateTime) -> bool {
        if self.entries.contains_key(fingerprint) {
            return false;
        }
        self.entries
            .insert(fingerprint.to_string(), SeenEntry { first_seen: at, record_ref: None });
        self.delta.push(fingerprint.to_string());
        true
    }

    /// Attach the stored record's reference to a known fingerprint.
    pub fn set_record_ref(&mut self, fingerprint: &str, record_ref: String) {
        if let Some(entry) = self.entries.get_mut(fingerprint) {
            entry.record_ref = Some(record_ref);
        }
    }

    /// Fingerprints added since seeding, in insertion order.
    pub fn delta(&self) -> &[String] {
        &self.delta
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of partitioning one batch of candidates.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub accepted: Vec<Article>,
    pub rejected_duplicates: usize,
    pub seen: SeenFingerprintSet,
}

/// Result of writing the accepted articles through an adapter.
#[derive(Debug, Clone, Default)]
pub struct PersistReport {
    /// Articles the adapter inserted.
    pub stored: Vec<Article>,
    /// Articles the adapter already had.
    pub conflicts: usize,
    pub failures: Vec<RunFailure>,
}

/// Drops candidates whose fingerprint is already known.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupMerger;

impl DedupMerger {
    pub fn new() -> Self {
        Self
    }

    /// Partition `candidates` in order.
    ///
    /// The first candidate with a fingerprint not in `seen` is accepted and its
    /// fingerprint recorded, so later copies in the same batch are duplicates.
    pub fn merge(&self, candidates: Vec<Article>, mut seen: SeenFingerprintSet) -> MergeOutcome {
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut rejected_duplicates = 0usize;

        for article in candidates {
            if seen.insert(&article.fingerprint, article.fetched_at) {
                accepted.push(article);
            } else {
                tracing::debug!(fingerprint = %article.fingerprint, link = %article.link, "duplicate skipped");
                rejected_duplicates += 1;
            }
        }

        MergeOutcome { accepted, rejected_duplicates, seen }
    }

    /// Upsert the accepted articles as one batch.
    ///
    /// A conflict means another writer stored the article first. Other adapter
    /// errors are collected and the remaining articles are still written.
    pub async fn persist(
        &self, accepted: Vec<Article>, adapter: &dyn PersistenceAdapter, seen: &mut SeenFingerprintSet,
    ) -> PersistReport {
        let mut report = PersistReport::default();

        let outcomes = adapter.upsert_batch(&accepted).await;
        for (article, outcome) in accepted.into_iter().zip(outcomes) {
            match outcome {
                Ok(UpsertOutcome::Inserted { record_ref }) => {
                    seen.set_record_ref(&article.fingerprint, record_ref);
                    report.stored.push(article);
                }
                Ok(UpsertOutcome::Conflict) => {
                    tracing::debug!(fingerprint = %article.fingerprint, "already stored");
                    report.conflicts += 1;
                }
                Err(e) => {
                    tracing::warn!(fingerprint = %article.fingerprint, link = %article.link, error = %e, "persist failed");
                    report.failures.push(RunFailure::Persistence {
                        fingerprint: article.fingerprint.clone(),
                        link: article.link.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
