//! HTTP surface: an import trigger for schedulers and a health check.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lumen_core::{Ingestor, LumenError, RunControl, RunSummary, Source};
use serde::Deserialize;
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    /// Used when a request names no sources of its own.
    pub sources: Arc<Vec<Source>>,
    pub run_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(ingestor: Ingestor, sources: Vec<Source>) -> Self {
        Self { ingestor: Arc::new(ingestor), sources: Arc::new(sources), run_timeout: None }
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = Some(run_timeout);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ImportRequest {
    #[serde(default)]
    sources: Option<Vec<Source>>,
}

/// An error rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<LumenError> for ApiError {
    fn from(err: LumenError) -> Self {
        let status = if err.is_fatal() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/import", post(import))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn import(State(state): State<AppState>, body: Bytes) -> Result<Json<RunSummary>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ImportRequest::default()
    } else {
        serde_json::from_slice::<ImportRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?
    };

    let control = match state.run_timeout {
        Some(run_timeout) => RunControl::new().with_timeout(run_timeout),
        None => RunControl::new(),
    };

    let summary = match &request.sources {
        Some(sources) => state.ingestor.run(sources, &control).await?,
        None => state.ingestor.run(&state.sources, &control).await?,
    };

    tracing::info!(
        accepted = summary.articles_accepted,
        duplicates = summary.duplicates_skipped,
        failed_sources = summary.sources_failed,
        "import finished"
    );
    Ok(Json(summary))
}
