//! Recommender configuration
//!
//! Values come from (lowest to highest priority) the built-in defaults, an
//! optional `config/recommender.{toml,yaml,json}` file, and `RECOMMENDER_*`
//! environment variables, e.g. `RECOMMENDER_INTERVAL_MINUTES=15`.

use crate::error::{RecommenderError, Result};
use crate::retry::RetryPolicy;
use crate::similarity::SimilarityMetric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted retrain interval: one week
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Log output format for the service binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Minutes between scheduled retrains (default: 30)
    pub interval_minutes: u64,

    /// Repository fetch attempts per retrain (default: 3)
    pub retry_attempts: u32,

    /// Fixed pause between fetch attempts (default: 1)
    pub retry_backoff_seconds: u64,

    /// Real interaction count at or below which synthetic data is used (default: 50)
    pub cold_start_threshold: usize,

    /// Synthetic events generated for every catalog item (default: 3)
    pub synthetic_per_item_events: usize,

    /// Extra uniformly random synthetic events (default: 200)
    pub synthetic_noise_events: usize,

    /// Number of synthetic user ids to draw from (default: 50)
    pub synthetic_user_pool_size: usize,

    /// Upper bound on latent dimensions (default: 12)
    pub max_latent_components: usize,

    /// Result size used by `RecommenderService::recommend` (default: 4)
    pub default_top_k: usize,

    pub similarity_metric: SimilarityMetric,

    /// Seed for synthetic data and random fallback; `None` seeds from entropy
    pub random_seed: Option<u64>,

    /// PostgreSQL URL for the interaction repository
    pub database_url: Option<String>,

    pub database_max_connections: u32,

    /// JSON file with `catalog` and `interactions`, used when no database is configured
    pub seed_data_path: Option<PathBuf>,

    pub log_format: LogFormat,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
            retry_attempts: 3,
            retry_backoff_seconds: 1,
            cold_start_threshold: 50,
            synthetic_per_item_events: 3,
            synthetic_noise_events: 200,
            synthetic_user_pool_size: 50,
            max_latent_components: 12,
            default_top_k: 4,
            similarity_metric: SimilarityMetric::Cosine,
            random_seed: None,
            database_url: None,
            database_max_connections: 5,
            seed_data_path: None,
            log_format: LogFormat::Text,
        }
    }
}

impl RecommenderConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/recommender").required(false))
            .add_source(config::Environment::with_prefix("RECOMMENDER").try_parsing(true))
            .build()
            .map_err(|e| RecommenderError::Configuration {
                message: e.to_string(),
                key: None,
            })?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| RecommenderError::Configuration {
                message: e.to_string(),
                key: None,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(RecommenderError::config(
                "interval_minutes must be greater than 0",
                "RECOMMENDER_INTERVAL_MINUTES",
            ));
        }

        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(RecommenderError::config(
                format!("interval_minutes must be at most {}", MAX_INTERVAL_MINUTES),
                "RECOMMENDER_INTERVAL_MINUTES",
            ));
        }

        if self.retry_attempts == 0 {
            return Err(RecommenderError::config(
                "retry_attempts must be at least 1",
                "RECOMMENDER_RETRY_ATTEMPTS",
            ));
        }

        if self.synthetic_user_pool_size == 0 {
            return Err(RecommenderError::config(
                "synthetic_user_pool_size must be at least 1",
                "RECOMMENDER_SYNTHETIC_USER_POOL_SIZE",
            ));
        }

        if self.max_latent_components == 0 {
            return Err(RecommenderError::config(
                "max_latent_components must be at least 1",
                "RECOMMENDER_MAX_LATENT_COMPONENTS",
            ));
        }

        if self.default_top_k == 0 {
            return Err(RecommenderError::config(
                "default_top_k must be at least 1",
                "RECOMMENDER_DEFAULT_TOP_K",
            ));
        }

        if self.database_max_connections == 0 {
            return Err(RecommenderError::config(
                "database_max_connections must be greater than 0",
                "RECOMMENDER_DATABASE_MAX_CONNECTIONS",
            ));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.retry_attempts,
            Duration::from_secs(self.retry_backoff_seconds),
        )
    }
}
