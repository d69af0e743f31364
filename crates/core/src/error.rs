//! Error types for Lumen operations.
//!
//! [`LumenError`] covers everything that can go wrong while fetching feeds and
//! pages, parsing markup, and talking to a persistence backend. Most of these
//! never escape an ingestion run: the pipeline recovers from them per source or
//! per entry and records them in the run summary. Only configuration problems
//! detected before the first fetch abort a run.
//!
//! # Example
//!
//! ```rust
//! use lumen_core::{LumenError, Result};
//!
//! fn require_sources(count: usize) -> Result<()> {
//!     if count == 0 {
//!         return Err(LumenError::Config("no sources supplied".to_string()));
//!     }
//!     Ok(())
//! }
//! # assert!(require_sources(0).is_err());
//! ```

use thiserror::Error;

/// Main error type for the ingestion pipeline.
#[derive(Error, Debug)]
pub enum LumenError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps DNS failures, refused connections, TLS problems and body decoding errors.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The server answered with a non-success status code.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The feed document is not RSS or Atom, or is malformed XML.
    #[error("Failed to parse feed: {0}")]
    FeedParseError(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Content is not readable (score below threshold).
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// No content could be extracted from the document.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// The persistence backend failed for a reason other than a uniqueness conflict.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Fatal configuration problem detected before a run starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON or TOML (de)serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The run was cancelled or hit its deadline before this operation finished.
    #[error("Run cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for LumenError {
    fn from(err: serde_json::Error) -> Self {
        LumenError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LumenError {
    fn from(err: toml::de::Error) -> Self {
        LumenError::Serialization(err.to_string())
    }
}

impl From<quick_xml::de::DeError> for LumenError {
    fn from(err: quick_xml::de::DeError) -> Self {
        LumenError::FeedParseError(err.to_string())
    }
}

impl LumenError {
    /// Whether this error is one of the fatal configuration errors that prevent a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LumenError::Config(_))
    }
}

/// Result type alias for LumenError.
pub type Result<T> = std::result::Result<T, LumenError>;
