//! Engine registry
//!
//! Owns the repository and configuration and hands out the one shared
//! [`RecommenderService`]. The first caller pays for a warm-up retrain;
//! concurrent first callers all wait on that same initialization.

use crate::config::RecommenderConfig;
use crate::error::{RecommenderError, Result};
use crate::recommendation::RecommenderService;
use crate::repository::InteractionRepository;
use crate::scheduler::{RetrainReport, RetrainScheduler};
use once_cell::sync::OnceCell as GlobalCell;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

static GLOBAL_REGISTRY: GlobalCell<Arc<EngineRegistry>> = GlobalCell::new();

/// Service plus the scheduler that retrains it
#[derive(Clone)]
struct EngineHandle {
    service: Arc<RecommenderService>,
    scheduler: Arc<RetrainScheduler>,
}

pub struct EngineRegistry {
    repository: Arc<dyn InteractionRepository>,
    config: RecommenderConfig,
    engine: OnceCell<EngineHandle>,
}

impl EngineRegistry {
    pub fn new(repository: Arc<dyn InteractionRepository>, config: RecommenderConfig) -> Self {
        Self {
            repository,
            config,
            engine: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }

    /// The shared service, created and warmed up on first use
    ///
    /// A failed warm-up still yields a service; it stays offline until a
    /// later retrain succeeds.
    pub async fn get_instance(&self) -> Arc<RecommenderService> {
        self.engine().await.service.clone()
    }

    pub async fn scheduler(&self) -> Arc<RetrainScheduler> {
        self.engine().await.scheduler.clone()
    }

    /// Administrative retrain; waits for any retrain already running
    pub async fn force_retrain(&self) -> RetrainReport {
        self.engine().await.scheduler.trigger_now().await
    }

    async fn engine(&self) -> &EngineHandle {
        self.engine.get_or_init(|| self.initialize()).await
    }

    async fn initialize(&self) -> EngineHandle {
        info!(
            interval_minutes = self.config.interval_minutes,
            metric = ?self.config.similarity_metric,
            "Initializing recommendation engine"
        );

        let service = Arc::new(RecommenderService::from_config(&self.config));
        let scheduler = Arc::new(RetrainScheduler::from_config(
            service.clone(),
            self.repository.clone(),
            &self.config,
        ));

        let report = scheduler.trigger_now().await;
        if report.is_success() {
            info!("Recommendation engine ready");
        } else {
            warn!(
                message = %report.message,
                "Warm-up training failed, recommender starts offline"
            );
        }

        EngineHandle { service, scheduler }
    }
}

/// Install the process-wide registry; fails if one is already installed
pub fn install_global(registry: Arc<EngineRegistry>) -> Result<()> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| RecommenderError::config("engine registry is already installed", "registry"))
}

/// The process-wide registry, if one has been installed
pub fn global() -> Option<Arc<EngineRegistry>> {
    GLOBAL_REGISTRY.get().cloned()
}
