use std::sync::Arc;
use std::time::Duration;

use lumen_core::{HttpFetcher, Ingestor, JsonFileStore, PersistenceAdapter, PipelineConfig, Result, load_sources};
use lumen_server::{AppState, PgStore, ServerConfig, router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn build_adapter(config: &ServerConfig) -> Result<Arc<dyn PersistenceAdapter>> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.concurrency.max(1) * 2)?;
            store.ensure_schema().await?;
            tracing::info!("storing articles in postgres");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(path = %config.store_path.display(), "storing articles in a json file");
            Ok(Arc::new(JsonFileStore::new(&config.store_path)))
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ServerConfig::from_env()?;

    let sources = match &config.sources_path {
        Some(path) => load_sources(path)?,
        None => {
            tracing::warn!("LUMEN_SOURCES is not set; imports need sources in the request body");
            Vec::new()
        }
    };

    let adapter = build_adapter(&config).await?;
    let fetcher = HttpFetcher::new(&config.fetch_config())?;
    let pipeline = PipelineConfig { concurrency: config.concurrency, ..Default::default() };
    let mut state = AppState::new(Ingestor::new(Arc::new(fetcher), adapter, pipeline), sources);
    if let Some(secs) = config.run_timeout {
        state = state.with_run_timeout(Duration::from_secs(secs));
    }

    let listener = TcpListener::bind(config.bind.as_str()).await?;
    tracing::info!(bind = %config.bind, sources = state.sources.len(), "lumen-server listening");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
