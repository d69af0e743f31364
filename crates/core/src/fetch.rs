//! Retrieving feed documents and web pages.
//!
//! Everything the pipeline downloads goes through the [`Fetcher`] trait so a run
//! can be driven against in-memory fixtures ([`StaticFetcher`]) as easily as
//! against the network ([`HttpFetcher`]).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::{LumenError, Result};

/// HTTP client configuration for fetching feeds and pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Identifying User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            user_agent: format!(
                "lumen/{} (+https://github.com/lumen-news/lumen)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

/// Something that can GET a URL and hand back the body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Validate that `url` is an absolute http(s) URL.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| LumenError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(LumenError::InvalidUrl(format!(
            "{}: unsupported scheme {} (expected http or https)",
            url, other
        ))),
    }
}

/// [`Fetcher`] backed by a shared reqwest client.
///
/// The client follows redirects and applies the configured timeout to the whole
/// request, so no fetch can block indefinitely.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(LumenError::HttpError)?;

        Ok(Self { client, timeout: config.timeout })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed_url = parse_http_url(url)?;

        let response = self
            .client
            .get(parsed_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/rss+xml,application/atom+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LumenError::Timeout { timeout: self.timeout }
                } else {
                    LumenError::HttpError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LumenError::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                LumenError::Timeout { timeout: self.timeout }
            } else {
                LumenError::HttpError(e)
            }
        })
    }
}

/// [`Fetcher`] serving fixed bodies from memory.
///
/// URLs that were never registered fail the way an unreachable host would.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` as the response for `url`.
    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.insert(url.into(), body.into());
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        parse_http_url(url)?;
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| LumenError::HttpStatus { url: url.to_string(), status: 404 })
    }
}

/// Reads a document from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(LumenError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path_buf.display()),
        )))
    } else {
        fs::read_to_string(&path_buf).map_err(LumenError::from)
    }
}
