//! HTTP trigger and Postgres storage for the Lumen ingestion pipeline.

pub mod config;
pub mod pg;
pub mod routes;

pub use config::ServerConfig;
pub use pg::PgStore;
pub use routes::{ApiError, AppState, router};
