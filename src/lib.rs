pub mod aggregator;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod routes;
mod scheduler;
pub mod scraping;
#[cfg(test)]
mod testing;
mod utils;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aggregator::{Aggregator, AggregatorSettings};
use config::{AppConfig, ConfigError, StorageBackend};
use db::{EventStore, SqliteStore, SupabaseStore};
use llm::GeminiClient;
use pipeline::Pipeline;
use routes::AppState;
use scraping::FirecrawlClient;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unievent_lib=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn build_store(config: &AppConfig) -> Result<Arc<dyn EventStore>> {
    match config.storage {
        StorageBackend::Supabase => {
            let (url, key) = config.supabase_credentials()?;
            tracing::info!(table = %config.events_table, "using supabase storage");
            Ok(Arc::new(SupabaseStore::new(url, key, &config.events_table)))
        }
        StorageBackend::Sqlite => {
            tracing::info!(path = ?config.sqlite_path, "using sqlite storage");
            let store = SqliteStore::open(&config.sqlite_path)
                .with_context(|| format!("failed to open {:?}", config.sqlite_path))?;
            Ok(Arc::new(store))
        }
    }
}

pub fn build_pipeline(config: &AppConfig, store: Arc<dyn EventStore>) -> Result<Pipeline> {
    let firecrawl = Arc::new(
        FirecrawlClient::new(&config.firecrawl_base_url, config.firecrawl_key()?).with_polling(
            Duration::from_millis(config.firecrawl_poll_interval_ms),
            config.firecrawl_max_polls,
        ),
    );
    Ok(Pipeline::new(firecrawl.clone(), firecrawl, store)
        .with_search_limit(config.search_limit)
        .with_wait_ms(config.extract_wait_ms))
}

pub fn build_aggregator(
    config: &AppConfig,
    store: Arc<dyn EventStore>,
) -> Result<Aggregator, ConfigError> {
    let model = GeminiClient::from_config(config)?;
    Ok(Aggregator::new(
        Arc::new(model),
        store,
        AggregatorSettings::from_config(config),
    ))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = AppConfig::from_env().context("invalid configuration")?;

    let store = build_store(&config)?;
    let pipeline = build_pipeline(&config, store.clone())?;
    let aggregator = match build_aggregator(&config, store.clone()) {
        Ok(aggregator) => Some(Arc::new(aggregator)),
        Err(err) => {
            tracing::warn!("weekly update disabled: {err}");
            None
        }
    };

    if let (Some(aggregator), Some(every)) = (&aggregator, config.weekly_interval()) {
        tracing::info!(?every, "scheduling weekly update");
        scheduler::spawn_weekly(aggregator.clone(), every);
    }

    let state = AppState {
        pipeline: Arc::new(pipeline),
        store,
        aggregator,
    };
    let app = routes::build_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "unievent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
    tracing::info!("shutting down");
}
