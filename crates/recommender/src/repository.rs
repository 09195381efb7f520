//! Interaction data sources
//!
//! The engine only ever reads two things: the raw implicit-feedback events
//! and the catalog of recommendable item ids. Both sit behind
//! [`InteractionRepository`] so the builder can be driven by PostgreSQL in
//! production and by an in-memory store in tests.

use crate::error::RepositoryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;

/// One implicit-feedback event (a play or a like). Presence means weight 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: String,
    pub item_id: String,
}

impl InteractionRecord {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Read-only source of interactions and catalog ids
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn fetch_interactions(&self) -> Result<Vec<InteractionRecord>, RepositoryError>;

    async fn fetch_catalog_ids(&self) -> Result<Vec<String>, RepositoryError>;
}

/// Snapshot file format accepted by [`InMemoryInteractionRepository::from_json_file`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    pub catalog: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<InteractionRecord>,
}

/// Repository backed by process memory; contents can be replaced at runtime
#[derive(Debug, Default)]
pub struct InMemoryInteractionRepository {
    data: RwLock<SeedData>,
}

impl InMemoryInteractionRepository {
    pub fn new(catalog: Vec<String>, interactions: Vec<InteractionRecord>) -> Self {
        Self {
            data: RwLock::new(SeedData {
                catalog,
                interactions,
            }),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::Connectivity(format!("cannot read {}: {}", path.display(), e))
        })?;
        let data: SeedData =
            serde_json::from_str(&raw).map_err(|e| RepositoryError::Decode(e.to_string()))?;

        tracing::info!(
            path = %path.display(),
            catalog = data.catalog.len(),
            interactions = data.interactions.len(),
            "Loaded seed data"
        );

        Ok(Self {
            data: RwLock::new(data),
        })
    }

    pub fn set_catalog(&self, catalog: Vec<String>) {
        self.data.write().catalog = catalog;
    }

    pub fn set_interactions(&self, interactions: Vec<InteractionRecord>) {
        self.data.write().interactions = interactions;
    }

    pub fn push_interaction(&self, record: InteractionRecord) {
        self.data.write().interactions.push(record);
    }
}

#[async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn fetch_interactions(&self) -> Result<Vec<InteractionRecord>, RepositoryError> {
        Ok(self.data.read().interactions.clone())
    }

    async fn fetch_catalog_ids(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.data.read().catalog.clone())
    }
}

/// PostgreSQL repository
///
/// Expects `user_interactions(user_id, item_id)` and `catalog_items(id)`.
/// Ids of any column type are read as text.
pub struct PostgresInteractionRepository {
    pool: PgPool,
}

impl PostgresInteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily connecting pool; an unreachable database surfaces on
    /// the first fetch as a retryable connectivity error instead of at startup.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .map_err(classify_sqlx_error)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl InteractionRepository for PostgresInteractionRepository {
    async fn fetch_interactions(&self) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id::text AS user_id, item_id::text AS item_id
            FROM user_interactions
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<InteractionRecord, RepositoryError> {
                Ok(InteractionRecord {
                    user_id: row
                        .try_get("user_id")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    item_id: row
                        .try_get("item_id")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn fetch_catalog_ids(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT id::text AS id FROM catalog_items")
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }
}

fn classify_sqlx_error(error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => RepositoryError::Connectivity(error.to_string()),
        sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_) => RepositoryError::Decode(error.to_string()),
        other => RepositoryError::Query(other.to_string()),
    }
}
