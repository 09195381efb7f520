//! RecommenderService tests against trained snapshots

use crate::builder::MatrixBuilder;
use crate::cold_start::ColdStartPolicy;
use crate::factorization::LatentFactorTrainer;
use crate::model::ModelState;
use crate::recommendation::{EngineStatus, RecommenderService};
use crate::repository::InMemoryInteractionRepository;
use crate::retry::RetryPolicy;
use crate::similarity::SimilarityMetric;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

async fn synthetic_state(catalog_size: usize) -> ModelState {
    let catalog = (1..=catalog_size).map(|i| format!("s{}", i)).collect();
    let repo = InMemoryInteractionRepository::new(catalog, Vec::new());
    let built = MatrixBuilder::new(
        RetryPolicy::immediate(1),
        ColdStartPolicy::default(),
        StdRng::seed_from_u64(11),
    )
    .build(&repo)
    .await
    .unwrap();

    LatentFactorTrainer::new(12, SimilarityMetric::Cosine)
        .train(built)
        .unwrap()
}

#[tokio::test]
async fn test_results_never_contain_query() {
    let service = RecommenderService::new(4, StdRng::seed_from_u64(3));
    service.publish(synthetic_state(8).await);

    for i in 1..=8 {
        let id = format!("s{}", i);
        for k in [1, 4, 7, 20] {
            let result = service.recommend_for(&id, k);
            assert!(!result.contains(&id));
            assert_eq!(result.len(), k.min(7));
            let unique: HashSet<_> = result.iter().collect();
            assert_eq!(unique.len(), result.len());
        }
    }
}

#[tokio::test]
async fn test_fallback_is_reproducible_with_seed() {
    let state = synthetic_state(10).await;

    let a = RecommenderService::new(4, StdRng::seed_from_u64(9));
    let b = RecommenderService::new(4, StdRng::seed_from_u64(9));
    a.publish(state.clone());
    b.publish(state);

    for _ in 0..5 {
        assert_eq!(a.recommend("missing"), b.recommend("missing"));
    }
}

#[tokio::test]
async fn test_ready_status_reports_snapshot() {
    let service = RecommenderService::new(4, StdRng::seed_from_u64(3));
    service.publish(synthetic_state(5).await);

    let status = service.status();
    match &status {
        EngineStatus::Ready {
            items,
            catalog_size,
            latent_dimensions,
            ..
        } => {
            assert_eq!(*items, 5);
            assert_eq!(*catalog_size, 5);
            assert_eq!(*latent_dimensions, 4);
        }
        EngineStatus::Offline => panic!("expected ready status"),
    }

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["source"], "synthetic");
}
