//! Interaction matrix builder
//!
//! Fetches interactions and the catalog from the repository (with retry),
//! validates interactions against the catalog and decides between real and
//! synthetic training data.

use crate::cold_start::ColdStartPolicy;
use crate::config::RecommenderConfig;
use crate::error::{RecommenderError, RepositoryError, Result};
use crate::matrix::InteractionMatrix;
use crate::model::TrainingSource;
use crate::repository::{InteractionRecord, InteractionRepository};
use crate::retry::{retry_with_backoff, RetryPolicy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// Output of a successful build
#[derive(Debug, Clone)]
pub struct BuiltMatrix {
    pub matrix: InteractionMatrix,
    /// Sorted, de-duplicated catalog ids
    pub catalog: Vec<String>,
    pub source: TrainingSource,
}

/// Builds interaction matrices for the trainer
///
/// Owns the random source used for synthetic data, so only one build should
/// run at a time; the scheduler keeps it behind a mutex.
pub struct MatrixBuilder {
    retry_policy: RetryPolicy,
    cold_start: ColdStartPolicy,
    rng: StdRng,
}

impl MatrixBuilder {
    pub fn new(retry_policy: RetryPolicy, cold_start: ColdStartPolicy, rng: StdRng) -> Self {
        Self {
            retry_policy,
            cold_start,
            rng,
        }
    }

    pub fn from_config(config: &RecommenderConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self::new(
            config.retry_policy(),
            ColdStartPolicy {
                threshold: config.cold_start_threshold,
                per_item_events: config.synthetic_per_item_events,
                noise_events: config.synthetic_noise_events,
                user_pool_size: config.synthetic_user_pool_size,
            },
            rng,
        )
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub async fn build(&mut self, repository: &dyn InteractionRepository) -> Result<BuiltMatrix> {
        let (interactions, catalog) = self.fetch(repository).await?;

        let catalog = normalize_catalog(catalog);
        if catalog.is_empty() {
            tracing::warn!("No items found in catalog");
            return Err(RecommenderError::EmptyCatalog);
        }

        let known: HashSet<&str> = catalog.iter().map(String::as_str).collect();
        let fetched = interactions.len();
        let valid: Vec<InteractionRecord> = interactions
            .into_iter()
            .filter(|r| known.contains(r.item_id.as_str()))
            .collect();
        if valid.len() < fetched {
            tracing::debug!(
                dropped = fetched - valid.len(),
                "Ignoring interactions for items outside the catalog"
            );
        }

        // The threshold counts every fetched row, including ones for retired items
        let (records, source) = if self.cold_start.applies(fetched) || valid.is_empty() {
            tracing::warn!(
                real_interactions = fetched,
                valid_interactions = valid.len(),
                threshold = self.cold_start.threshold,
                catalog_size = catalog.len(),
                "Too few interactions, training on synthetic data"
            );
            (
                self.cold_start.generate(&catalog, &mut self.rng),
                TrainingSource::Synthetic,
            )
        } else {
            tracing::info!(
                real_interactions = fetched,
                valid_interactions = valid.len(),
                "Training on observed interactions"
            );
            (valid, TrainingSource::Observed)
        };

        let matrix = InteractionMatrix::from_records(&records);
        let counts = matrix.item_counts();
        tracing::info!(
            users = matrix.num_users(),
            items = matrix.num_items(),
            nnz = matrix.nnz(),
            sparsest_item = counts.iter().min().copied().unwrap_or(0),
            uncovered_catalog_items = catalog.len().saturating_sub(matrix.num_items()),
            "Interaction matrix built"
        );

        Ok(BuiltMatrix {
            matrix,
            catalog,
            source,
        })
    }

    async fn fetch(
        &self,
        repository: &dyn InteractionRepository,
    ) -> Result<(Vec<InteractionRecord>, Vec<String>)> {
        retry_with_backoff(
            || async move {
                let interactions = repository.fetch_interactions().await?;
                let catalog = repository.fetch_catalog_ids().await?;
                Ok::<_, RepositoryError>((interactions, catalog))
            },
            &self.retry_policy,
            RepositoryError::is_retryable,
        )
        .await
        .map_err(|exhausted| {
            tracing::error!(
                attempts = exhausted.attempts,
                error = %exhausted.last_error,
                "Interaction repository unavailable"
            );
            RecommenderError::RepositoryUnavailable {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            }
        })
    }
}

fn normalize_catalog(mut catalog: Vec<String>) -> Vec<String> {
    catalog.sort();
    catalog.dedup();
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryInteractionRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn catalog(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("s{}", i)).collect()
    }

    fn builder(seed: u64) -> MatrixBuilder {
        MatrixBuilder::new(
            RetryPolicy::immediate(3),
            ColdStartPolicy::default(),
            StdRng::seed_from_u64(seed),
        )
    }

    /// Fails the first `failures` fetches with the given error
    struct FlakyRepository {
        calls: AtomicU32,
        failures: u32,
        error: RepositoryError,
        inner: InMemoryInteractionRepository,
    }

    #[async_trait]
    impl InteractionRepository for FlakyRepository {
        async fn fetch_interactions(&self) -> std::result::Result<Vec<InteractionRecord>, RepositoryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.error.clone());
            }
            self.inner.fetch_interactions().await
        }

        async fn fetch_catalog_ids(&self) -> std::result::Result<Vec<String>, RepositoryError> {
            self.inner.fetch_catalog_ids().await
        }
    }

    #[tokio::test]
    async fn test_cold_start_uses_synthetic_data() {
        let repo = InMemoryInteractionRepository::new(catalog(5), Vec::new());
        let built = builder(42).build(&repo).await.unwrap();

        assert_eq!(built.source, TrainingSource::Synthetic);
        assert_eq!(built.catalog, catalog(5));
        assert_eq!(built.matrix.num_items(), 5);
        assert!(built.matrix.num_users() <= 50);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let records: Vec<InteractionRecord> = (0..50)
            .map(|i| InteractionRecord::new(format!("u{}", i), format!("s{}", i % 5 + 1)))
            .collect();
        let repo = InMemoryInteractionRepository::new(catalog(5), records);
        let built = builder(1).build(&repo).await.unwrap();
        assert_eq!(built.source, TrainingSource::Synthetic);

        repo.push_interaction(InteractionRecord::new("u50", "s1"));
        let built = builder(1).build(&repo).await.unwrap();
        assert_eq!(built.source, TrainingSource::Observed);
        assert_eq!(built.matrix.num_users(), 51);
    }

    #[tokio::test]
    async fn test_interactions_outside_catalog_are_dropped() {
        let mut records: Vec<InteractionRecord> = (0..60)
            .map(|i| InteractionRecord::new(format!("u{}", i), format!("s{}", i % 3 + 1)))
            .collect();
        records.push(InteractionRecord::new("u0", "retired"));

        let repo = InMemoryInteractionRepository::new(catalog(3), records);
        let built = builder(1).build(&repo).await.unwrap();

        assert_eq!(built.source, TrainingSource::Observed);
        assert_eq!(built.matrix.item_ids(), &["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn test_threshold_counts_rows_for_retired_items() {
        let mut records: Vec<InteractionRecord> = (0..45)
            .map(|i| InteractionRecord::new(format!("u{}", i), format!("s{}", i % 5 + 1)))
            .collect();
        records.extend((0..15).map(|i| InteractionRecord::new(format!("u{}", i), "retired")));

        let repo = InMemoryInteractionRepository::new(catalog(5), records);
        let built = builder(1).build(&repo).await.unwrap();

        assert_eq!(built.source, TrainingSource::Observed);
        assert_eq!(built.matrix.num_users(), 45);
        assert_eq!(built.matrix.item_ids(), catalog(5).as_slice());
    }

    #[tokio::test]
    async fn test_only_retired_rows_fall_back_to_synthetic() {
        let records: Vec<InteractionRecord> = (0..60)
            .map(|i| InteractionRecord::new(format!("u{}", i), "retired"))
            .collect();

        let repo = InMemoryInteractionRepository::new(catalog(3), records);
        let built = builder(1).build(&repo).await.unwrap();

        assert_eq!(built.source, TrainingSource::Synthetic);
        assert_eq!(built.matrix.num_items(), 3);
    }

    #[tokio::test]
    async fn test_catalog_is_sorted_and_deduplicated() {
        let repo = InMemoryInteractionRepository::new(
            vec!["b".into(), "a".into(), "b".into()],
            Vec::new(),
        );
        let built = builder(3).build(&repo).await.unwrap();
        assert_eq!(built.catalog, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let repo = InMemoryInteractionRepository::new(Vec::new(), Vec::new());
        let result = builder(0).build(&repo).await;
        assert!(matches!(result, Err(RecommenderError::EmptyCatalog)));
    }

    #[tokio::test]
    async fn test_retries_connectivity_errors() {
        let repo = FlakyRepository {
            calls: AtomicU32::new(0),
            failures: 2,
            error: RepositoryError::Connectivity("refused".into()),
            inner: InMemoryInteractionRepository::new(catalog(4), Vec::new()),
        };

        let built = builder(0).build(&repo).await.unwrap();
        assert_eq!(built.catalog.len(), 4);
        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_policy_attempts() {
        let repo = FlakyRepository {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            error: RepositoryError::Connectivity("refused".into()),
            inner: InMemoryInteractionRepository::default(),
        };

        match builder(0).build(&repo).await {
            Err(RecommenderError::RepositoryUnavailable { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RepositoryUnavailable, got {:?}", other.map(|b| b.source)),
        }
        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_query_errors_are_not_retried() {
        let repo = FlakyRepository {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            error: RepositoryError::Query("relation does not exist".into()),
            inner: InMemoryInteractionRepository::default(),
        };

        let result = builder(0).build(&repo).await;
        assert!(matches!(
            result,
            Err(RecommenderError::RepositoryUnavailable { attempts: 1, .. })
        ));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_seeded_builds_are_reproducible() {
        let repo = InMemoryInteractionRepository::new(catalog(6), Vec::new());
        let a = builder(99).build(&repo).await.unwrap();
        let b = builder(99).build(&repo).await.unwrap();
        assert_eq!(a.matrix, b.matrix);
    }
}
