//! Retrain scheduling
//!
//! Runs the build → train → publish pipeline on a fixed interval and on
//! demand. Only one pipeline runs at a time: the [`MatrixBuilder`] lives
//! behind an async mutex and holding it is the right to retrain.

use crate::builder::MatrixBuilder;
use crate::config::{RecommenderConfig, MAX_INTERVAL_MINUTES};
use crate::error::{RecommenderError, Result};
use crate::factorization::LatentFactorTrainer;
use crate::model::ModelState;
use crate::recommendation::RecommenderService;
use crate::repository::InteractionRepository;
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

const SUCCESS_MESSAGE: &str = "Model retrained.";
const MIN_INTERVAL: Duration = Duration::from_millis(1);
const MAX_INTERVAL: Duration = Duration::from_secs(MAX_INTERVAL_MINUTES * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrainStatus {
    Success,
    Failure,
}

/// Outcome of one retrain, as reported to administrative callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrainReport {
    pub status: RetrainStatus,
    pub message: String,
}

impl RetrainReport {
    pub fn success() -> Self {
        Self {
            status: RetrainStatus::Success,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: RetrainStatus::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RetrainStatus::Success
    }
}

/// Coordinates retraining for one [`RecommenderService`]
pub struct RetrainScheduler {
    service: Arc<RecommenderService>,
    repository: Arc<dyn InteractionRepository>,
    trainer: LatentFactorTrainer,
    builder: Mutex<MatrixBuilder>,
    interval: Duration,
    runs: AtomicU64,
    last_report: SyncMutex<Option<RetrainReport>>,
}

impl RetrainScheduler {
    pub fn new(
        service: Arc<RecommenderService>,
        repository: Arc<dyn InteractionRepository>,
        builder: MatrixBuilder,
        trainer: LatentFactorTrainer,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            repository,
            trainer,
            builder: Mutex::new(builder),
            // tokio intervals reject a zero period and deadlines must not overflow
            interval: interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
            runs: AtomicU64::new(0),
            last_report: SyncMutex::new(None),
        }
    }

    pub fn from_config(
        service: Arc<RecommenderService>,
        repository: Arc<dyn InteractionRepository>,
        config: &RecommenderConfig,
    ) -> Self {
        Self::new(
            service,
            repository,
            MatrixBuilder::from_config(config),
            LatentFactorTrainer::from_config(config),
            config.interval(),
        )
    }

    pub fn service(&self) -> &Arc<RecommenderService> {
        &self.service
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of pipelines that have finished, successfully or not
    pub fn runs_completed(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<RetrainReport> {
        self.last_report.lock().clone()
    }

    /// Retrain now, waiting for any pipeline already in flight
    pub async fn trigger_now(&self) -> RetrainReport {
        let mut builder = self.builder.lock().await;
        self.run_pipeline(&mut builder).await
    }

    /// Retrain unless a pipeline is already running, in which case `None`
    pub async fn try_trigger(&self) -> Option<RetrainReport> {
        let mut builder = self.builder.try_lock().ok()?;
        Some(self.run_pipeline(&mut builder).await)
    }

    async fn run_pipeline(&self, builder: &mut MatrixBuilder) -> RetrainReport {
        let started = Instant::now();
        info!("Retraining recommendation model");

        let report = match self.build_and_train(builder).await {
            Ok(state) => {
                self.service.publish(state);
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Retrain completed"
                );
                RetrainReport::success()
            }
            Err(RecommenderError::EmptyCatalog) => {
                warn!("Catalog is empty, taking recommender offline");
                self.service.go_offline();
                RetrainReport::failure(RecommenderError::EmptyCatalog.to_string())
            }
            Err(e) => {
                error!(
                    error = %e,
                    offline = self.service.is_offline(),
                    "Retrain failed, keeping current model"
                );
                RetrainReport::failure(e.to_string())
            }
        };

        self.runs.fetch_add(1, Ordering::SeqCst);
        *self.last_report.lock() = Some(report.clone());
        report
    }

    async fn build_and_train(&self, builder: &mut MatrixBuilder) -> Result<ModelState> {
        let built = builder.build(self.repository.as_ref()).await?;

        let trainer = self.trainer.clone();
        match tokio::task::spawn_blocking(move || trainer.train(built)).await {
            Ok(result) => result,
            Err(e) => Err(RecommenderError::Internal(format!(
                "training task failed: {}",
                e
            ))),
        }
    }

    /// Retrain every `interval` until `shutdown` flips to `true` or its sender is dropped
    ///
    /// The first tick fires one interval after start; ticks missed while a
    /// retrain was running are skipped.
    pub async fn run_periodic(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval_at(time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            "Starting periodic retrain task"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.try_trigger().await.is_none() {
                        info!("Retrain already in progress, skipping scheduled run");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Periodic retrain task stopped");
    }

    /// Spawn [`run_periodic`](Self::run_periodic) on the current runtime
    pub fn spawn_periodic(self: &Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.clone().run_periodic(shutdown_rx));
        SchedulerHandle { shutdown_tx, join }
    }
}

/// Handle to a running periodic retrain task
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the task to stop and wait for it; an in-flight retrain finishes first
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "Periodic retrain task panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
