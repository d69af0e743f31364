pub mod assemble;
pub mod canonical;
pub mod config;
pub mod control;
pub mod dedup;
pub mod dom_tree;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod fetch;
pub mod fingerprint;
pub mod ingest;
pub mod metadata;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod preprocess;
pub mod readability;
pub mod scoring;
pub mod store;
pub mod summary;
pub mod text;

pub use assemble::{Field, Origin, assemble_article};
pub use canonical::{canonical_text, canonical_url};
pub use config::{SourcesFormat, load_sources, parse_sources, validate_sources};
pub use control::{CancelHandle, RunControl};
pub use dedup::{DedupMerger, MergeOutcome, PersistReport, SeenEntry, SeenFingerprintSet};
#[doc(hidden)]
pub use dom_tree::{DomNode, DomTree, NodeId};
pub use error::{LumenError, Result};
pub use extractor::{ContentExtractor, ExtractedContent};
pub use feed::{FeedError, FeedFormat, FeedReader, ParsedFeed, parse_feed};
pub use fetch::{FetchConfig, Fetcher, HttpFetcher, StaticFetcher, fetch_file};
pub use fingerprint::{fingerprint, is_fingerprint};
pub use ingest::{IngestOutcome, Ingestor};
pub use metadata::Metadata;
pub use model::{Article, FeedEntry, Leaning, Source};
pub use parse::Document;
pub use pipeline::{IngestionPipeline, PipelineConfig, PipelineCounters, PipelineOutput};
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use readability::{Readability, ReadabilityConfig, ReadabilityConfigBuilder, Readable};
#[doc(hidden)]
pub use scoring::{ScoreConfig, base_tag_score, class_id_weight, content_density_score, link_density};
pub use store::{JsonFileStore, MemoryStore, PersistenceAdapter, UpsertOutcome};
pub use summary::{RunFailure, RunSummary};
