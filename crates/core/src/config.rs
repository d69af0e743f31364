//! Loading the source list.
//!
//! Sources live in a TOML file of `[[sources]]` tables or in a JSON array. The
//! file extension picks the format; without a recognizable one both are tried.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::model::Source;
use crate::{LumenError, Result};

/// Supported source-list encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcesFormat {
    Toml,
    Json,
}

impl SourcesFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<Source>,
}

/// JSON accepts a bare array or an object with a `sources` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonSources {
    List(Vec<Source>),
    Wrapped(SourcesFile),
}

/// Parse a source list in a known format.
pub fn parse_sources(raw: &str, format: SourcesFormat) -> Result<Vec<Source>> {
    match format {
        SourcesFormat::Toml => Ok(toml::from_str::<SourcesFile>(raw)?.sources),
        SourcesFormat::Json => match serde_json::from_str::<JsonSources>(raw)? {
            JsonSources::List(sources) => Ok(sources),
            JsonSources::Wrapped(file) => Ok(file.sources),
        },
    }
}

/// Load a source list from `path`.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LumenError::Config(format!("reading sources from {}: {}", path.display(), e)))?;

    let parsed = match SourcesFormat::from_path(path) {
        Some(format) => parse_sources(&raw, format),
        None => parse_sources(&raw, SourcesFormat::Toml).or_else(|_| parse_sources(&raw, SourcesFormat::Json)),
    };

    parsed.map_err(|e| LumenError::Config(format!("invalid sources file {}: {}", path.display(), e)))
}

/// Reject source lists a run cannot start with.
///
/// The list must be non-empty, contain at least one active source, and use each
/// id at most once.
pub fn validate_sources(sources: &[Source]) -> Result<()> {
    if sources.is_empty() {
        return Err(LumenError::Config("no sources configured".to_string()));
    }
    if !sources.iter().any(|s| s.active) {
        return Err(LumenError::Config("no active sources configured".to_string()));
    }

    let mut ids = HashSet::new();
    if let Some(dup) = sources.iter().find(|s| !ids.insert(s.id.as_str())) {
        return Err(LumenError::Config(format!("duplicate source id: {}", dup.id)));
    }

    Ok(())
}
