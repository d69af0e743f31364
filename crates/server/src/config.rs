//! Server settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use lumen_core::{FetchConfig, LumenError, Result};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_STORE: &str = "data/articles.json";

/// Everything `lumen-server` needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `LUMEN_BIND`
    pub bind: String,
    /// `DATABASE_URL`; without it articles go to a JSON file.
    pub database_url: Option<String>,
    /// `LUMEN_STORE`
    pub store_path: PathBuf,
    /// `LUMEN_SOURCES`
    pub sources_path: Option<PathBuf>,
    /// `LUMEN_FETCH_TIMEOUT`, in seconds.
    pub fetch_timeout: u64,
    /// `LUMEN_RUN_TIMEOUT`, in seconds.
    pub run_timeout: Option<u64>,
    /// `LUMEN_CONCURRENCY`
    pub concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_url: None,
            store_path: PathBuf::from(DEFAULT_STORE),
            sources_path: None,
            fetch_timeout: FetchConfig::default().timeout,
            run_timeout: None,
            concurrency: 4,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            bind: get("LUMEN_BIND").unwrap_or(defaults.bind),
            database_url: get("DATABASE_URL"),
            store_path: get("LUMEN_STORE").map(PathBuf::from).unwrap_or(defaults.store_path),
            sources_path: get("LUMEN_SOURCES").map(PathBuf::from),
            fetch_timeout: parse_var("LUMEN_FETCH_TIMEOUT", get("LUMEN_FETCH_TIMEOUT"))?
                .unwrap_or(defaults.fetch_timeout),
            run_timeout: parse_var("LUMEN_RUN_TIMEOUT", get("LUMEN_RUN_TIMEOUT"))?,
            concurrency: parse_var("LUMEN_CONCURRENCY", get("LUMEN_CONCURRENCY"))?.unwrap_or(defaults.concurrency),
        })
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig { timeout: self.fetch_timeout, ..Default::default() }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|value| value.parse::<T>().map_err(|_| LumenError::Config(format!("{} is not a valid number: {}", key, value))))
        .transpose()
}
