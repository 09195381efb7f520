//! Resonance Recommender service
//!
//! Warms up the engine, retrains it every `interval_minutes` and runs until
//! interrupted. The data source is PostgreSQL when `RECOMMENDER_DATABASE_URL`
//! is set, otherwise a JSON seed file or an empty in-memory store.

use anyhow::Context;
use resonance_recommender::registry::{self, EngineRegistry};
use resonance_recommender::telemetry::init_tracing;
use resonance_recommender::{
    EngineStatus, InMemoryInteractionRepository, InteractionRepository,
    PostgresInteractionRepository, RecommenderConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = RecommenderConfig::load().context("Failed to load recommender configuration")?;
    init_tracing(config.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        interval_minutes = config.interval_minutes,
        "Starting recommender service"
    );

    let repository = build_repository(&config)?;
    let registry = Arc::new(EngineRegistry::new(repository, config));
    registry::install_global(registry.clone())?;

    let service = registry.get_instance().await;
    match service.status() {
        EngineStatus::Ready {
            items,
            catalog_size,
            source,
            ..
        } => info!(items, catalog_size, ?source, "Recommender online"),
        EngineStatus::Offline => warn!("Recommender offline until the next successful retrain"),
    }

    let scheduler = registry.scheduler().await;
    let handle = scheduler.spawn_periodic();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    handle.shutdown().await;
    info!("Recommender service stopped");

    Ok(())
}

fn build_repository(config: &RecommenderConfig) -> anyhow::Result<Arc<dyn InteractionRepository>> {
    if let Some(url) = &config.database_url {
        info!("Using PostgreSQL interaction repository");
        let repository =
            PostgresInteractionRepository::connect_lazy(url, config.database_max_connections)
                .context("Failed to create database pool")?;
        return Ok(Arc::new(repository));
    }

    if let Some(path) = &config.seed_data_path {
        let repository = InMemoryInteractionRepository::from_json_file(path)
            .with_context(|| format!("Failed to load seed data from {}", path.display()))?;
        return Ok(Arc::new(repository));
    }

    warn!("No database or seed data configured, starting with an empty catalog");
    Ok(Arc::new(InMemoryInteractionRepository::default()))
}
