//! Resonance Recommender - item-to-item collaborative filtering
//!
//! Learns latent item factors from implicit user interactions with a
//! truncated SVD and answers "items similar to X" from an immutable,
//! atomically swapped model snapshot. A background scheduler retrains the
//! model periodically and on demand; small catalogs are trained on synthetic
//! cold-start data.

pub mod builder;
pub mod cold_start;
pub mod config;
pub mod error;
pub mod factorization;
pub mod matrix;
pub mod model;
pub mod recommendation;
pub mod registry;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod similarity;
pub mod telemetry;

// Re-export key types
pub use builder::{BuiltMatrix, MatrixBuilder};
pub use cold_start::ColdStartPolicy;
pub use config::{LogFormat, RecommenderConfig};
pub use error::{RecommenderError, RepositoryError, Result};
pub use factorization::{LatentFactorTrainer, TruncatedSvd};
pub use matrix::InteractionMatrix;
pub use model::{ModelState, TrainingSource};
pub use recommendation::{EngineStatus, RecommenderService};
pub use registry::EngineRegistry;
pub use repository::{
    InMemoryInteractionRepository, InteractionRecord, InteractionRepository,
    PostgresInteractionRepository, SeedData,
};
pub use retry::RetryPolicy;
pub use scheduler::{RetrainReport, RetrainScheduler, RetrainStatus, SchedulerHandle};
pub use similarity::SimilarityMetric;

#[cfg(test)]
mod tests;
