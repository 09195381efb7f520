//! Error types for the recommendation engine
//!
//! Nothing in here is meant to reach a query caller: the service converts
//! every failure into an empty list, a random fallback, or a retained
//! snapshot. These types exist for the retrain path and for configuration.

use thiserror::Error;

/// Failure reported by an [`InteractionRepository`](crate::InteractionRepository)
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("Repository connection failed: {0}")]
    Connectivity(String),

    #[error("Repository query failed: {0}")]
    Query(String),

    #[error("Failed to decode repository rows: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Only connectivity problems are worth retrying; a malformed query
    /// fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::Connectivity(_))
    }
}

/// Errors produced while building, training or publishing a model
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("Interaction repository unavailable after {attempts} attempt(s): {source}")]
    RepositoryUnavailable {
        attempts: u32,
        #[source]
        source: RepositoryError,
    },

    #[error("Catalog is empty, nothing to train")]
    EmptyCatalog,

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Similarity computation failed: {0}")]
    Computation(String),

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecommenderError {
    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        RecommenderError::Configuration {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecommenderError>;
