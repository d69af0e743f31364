//! Persistence backends for ingested articles.
//!
//! A backend only needs two operations: list every fingerprint it already holds,
//! and insert an article unless its fingerprint is taken. The uniqueness check in
//! [`PersistenceAdapter::upsert`] is what keeps concurrent runs from storing the
//! same article twice.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::Article;
use crate::{LumenError, Result};

/// Outcome of a single insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Stored; `record_ref` identifies the new record in the backend.
    Inserted { record_ref: String },
    /// An article with the same fingerprint is already stored.
    Conflict,
}

/// Storage with a unique constraint on the article fingerprint.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Every fingerprint currently stored.
    async fn load_known_fingerprints(&self) -> Result<HashSet<String>>;

    /// Insert `article` unless its fingerprint is already stored.
    async fn upsert(&self, article: &Article) -> Result<UpsertOutcome>;

    /// Insert a run's accepted articles, returning one outcome per article in order.
    ///
    /// The default upserts them one at a time.
    async fn upsert_batch(&self, articles: &[Article]) -> Vec<Result<UpsertOutcome>> {
        let mut outcomes = Vec::with_capacity(articles.len());
        for article in articles {
            outcomes.push(self.upsert(article).await);
        }
        outcomes
    }
}

/// Process-local store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Mutex<Vec<Article>>,
    fail_fingerprints: HashSet<String>,
    fail_load: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `articles`.
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self { articles: Mutex::new(articles), ..Self::default() }
    }

    /// Make every upsert of `fingerprint` fail with a persistence error.
    pub fn failing_on(mut self, fingerprint: impl Into<String>) -> Self {
        self.fail_fingerprints.insert(fingerprint.into());
        self
    }

    /// Make [`PersistenceAdapter::load_known_fingerprints`] fail.
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Snapshot of the stored articles in insertion order.
    pub async fn articles(&self) -> Vec<Article> {
        self.articles.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.articles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.articles.lock().await.is_empty()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    async fn load_known_fingerprints(&self) -> Result<HashSet<String>> {
        if self.fail_load {
            return Err(LumenError::Persistence("store unavailable".to_string()));
        }
        Ok(self.articles.lock().await.iter().map(|a| a.fingerprint.clone()).collect())
    }

    async fn upsert(&self, article: &Article) -> Result<UpsertOutcome> {
        if self.fail_fingerprints.contains(&article.fingerprint) {
            return Err(LumenError::Persistence(format!("write rejected for {}", article.fingerprint)));
        }

        let mut articles = self.articles.lock().await;
        if articles.iter().any(|a| a.fingerprint == article.fingerprint) {
            return Ok(UpsertOutcome::Conflict);
        }
        articles.push(article.clone());
        Ok(UpsertOutcome::Inserted { record_ref: articles.len().to_string() })
    }
}

/// Articles kept as one pretty-printed JSON array on disk.
///
/// The file is read on first use. [`PersistenceAdapter::upsert`] rewrites it after
/// each insert; [`PersistenceAdapter::upsert_batch`] rewrites it once per batch.
/// Writes go to a sibling temp file that is then renamed over the original, so a
/// crash never leaves a half-written array behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<Option<Vec<Article>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cache: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored article, as currently on disk.
    pub async fn articles(&self) -> Result<Vec<Article>> {
        read_articles(&self.path).await
    }

    async fn write(&self, articles: &[Article]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(articles)?;
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

async fn read_articles(path: &Path) -> Result<Vec<Article>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|e| LumenError::Persistence(format!("{} is not an article array: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl PersistenceAdapter for JsonFileStore {
    async fn load_known_fingerprints(&self) -> Result<HashSet<String>> {
        let mut cache = self.cache.lock().await;
        let articles = read_articles(&self.path).await?;
        let known = articles.iter().map(|a| a.fingerprint.clone()).collect();
        *cache = Some(articles);
        Ok(known)
    }

    async fn upsert(&self, article: &Article) -> Result<UpsertOutcome> {
        let mut cache = self.cache.lock().await;
        let loaded = match cache.take() {
            Some(articles) => articles,
            None => read_articles(&self.path).await?,
        };
        let articles = cache.insert(loaded);

        if articles.iter().any(|a| a.fingerprint == article.fingerprint) {
            return Ok(UpsertOutcome::Conflict);
        }

        articles.push(article.clone());
        if let Err(e) = self.write(articles).await {
            articles.pop();
            return Err(LumenError::Persistence(format!("writing {}: {}", self.path.display(), e)));
        }
        Ok(UpsertOutcome::Inserted { record_ref: article.fingerprint.clone() })
    }

    async fn upsert_batch(&self, batch: &[Article]) -> Vec<Result<UpsertOutcome>> {
        let mut cache = self.cache.lock().await;
        let loaded = match cache.take() {
            Some(articles) => articles,
            None => match read_articles(&self.path).await {
                Ok(articles) => articles,
                Err(e) => {
                    let cause = e.to_string();
                    return batch.iter().map(|_| Err(LumenError::Persistence(cause.clone()))).collect();
                }
            },
        };
        let articles = cache.insert(loaded);
        let stored_before = articles.len();

        let mut known: HashSet<String> = articles.iter().map(|a| a.fingerprint.clone()).collect();
        let mut outcomes: Vec<Result<UpsertOutcome>> = Vec::with_capacity(batch.len());
        for article in batch {
            if known.insert(article.fingerprint.clone()) {
                articles.push(article.clone());
                outcomes.push(Ok(UpsertOutcome::Inserted { record_ref: article.fingerprint.clone() }));
            } else {
                outcomes.push(Ok(UpsertOutcome::Conflict));
            }
        }

        if articles.len() > stored_before
            && let Err(e) = self.write(articles).await
        {
            articles.truncate(stored_before);
            let cause = format!("writing {}: {}", self.path.display(), e);
            for outcome in outcomes.iter_mut().filter(|o| matches!(o, Ok(UpsertOutcome::Inserted { .. }))) {
                *outcome = Err(LumenError::Persistence(cause.clone()));
            }
        }
        outcomes
    }
}
