//! Postgres persistence through a deadpool connection pool.
//!
//! The `articles` table carries a unique constraint on `fingerprint`, so two
//! servers importing the same feed at once still store each article once: the
//! losing insert comes back with no row and is reported as a conflict.

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use lumen_core::{Article, LumenError, PersistenceAdapter, Result, UpsertOutcome};
use tokio_postgres::NoTls;
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS articles (
    id            UUID PRIMARY KEY,
    fingerprint   TEXT NOT NULL UNIQUE,
    source_id     TEXT NOT NULL,
    source_name   TEXT NOT NULL,
    leaning       TEXT NOT NULL,
    title         TEXT,
    link          TEXT NOT NULL,
    canonical_url TEXT NOT NULL,
    content       TEXT,
    html          TEXT,
    excerpt       TEXT,
    image         TEXT,
    published_at  TIMESTAMPTZ,
    fetched_at    TIMESTAMPTZ NOT NULL
)";

const INSERT: &str = "INSERT INTO articles (
    id, fingerprint, source_id, source_name, leaning, title, link, canonical_url,
    content, html, excerpt, image, published_at, fetched_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
ON CONFLICT (fingerprint) DO NOTHING
RETURNING id";

fn persistence(context: &str, err: impl std::fmt::Display) -> LumenError {
    LumenError::Persistence(format!("{}: {}", context, err))
}

/// Articles stored in Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Build a pool for `database_url`. No connection is opened until first use.
    pub fn connect(database_url: &str, max_size: usize) -> Result<Self> {
        let pg_config = tokio_postgres::Config::from_str(database_url)
            .map_err(|e| LumenError::Config(format!("invalid DATABASE_URL: {}", e)))?;
        let manager =
            Manager::from_config(pg_config, NoTls, ManagerConfig { recycling_method: RecyclingMethod::Fast });
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| LumenError::Config(format!("cannot build connection pool: {}", e)))?;
        Ok(Self { pool })
    }

    /// Create the `articles` table if it is missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await.map_err(|e| persistence("connecting", e))?;
        client.batch_execute(SCHEMA).await.map_err(|e| persistence("creating schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for PgStore {
    async fn load_known_fingerprints(&self) -> Result<HashSet<String>> {
        let client = self.pool.get().await.map_err(|e| persistence("connecting", e))?;
        let rows = client
            .query("SELECT fingerprint FROM articles", &[])
            .await
            .map_err(|e| persistence("loading fingerprints", e))?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn upsert(&self, article: &Article) -> Result<UpsertOutcome> {
        let client = self.pool.get().await.map_err(|e| persistence("connecting", e))?;
        let row = client
            .query_opt(
                INSERT,
                &[
                    &Uuid::new_v4(),
                    &article.fingerprint,
                    &article.source_id,
                    &article.source_name,
                    &article.leaning.as_str(),
                    &article.title,
                    &article.link,
                    &article.canonical_url,
                    &article.content,
                    &article.html,
                    &article.excerpt,
                    &article.image,
                    &article.published_at,
                    &article.fetched_at,
                ],
            )
            .await
            .map_err(|e| persistence("inserting article", e))?;

        Ok(match row {
            Some(row) => UpsertOutcome::Inserted { record_ref: row.get::<_, Uuid>(0).to_string() },
            None => UpsertOutcome::Conflict,
        })
    }
}
