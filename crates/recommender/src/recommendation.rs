//! Recommendation query surface
//!
//! Answers "items similar to X" against whichever [`ModelState`] is current.
//! Queries never fail: the worst outcome is an empty list.

use crate::config::RecommenderConfig;
use crate::model::{ModelState, TrainingSource};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health view of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineStatus {
    Offline,
    Ready {
        items: usize,
        users: usize,
        catalog_size: usize,
        latent_dimensions: usize,
        source: TrainingSource,
        trained_at: DateTime<Utc>,
    },
}

/// Similarity query service
///
/// Holds the current snapshot behind a lock that is only taken long enough
/// to clone or replace an `Arc`, so queries never wait on a retrain.
pub struct RecommenderService {
    current: RwLock<Option<Arc<ModelState>>>,
    rng: Mutex<StdRng>,
    default_top_k: usize,
}

impl RecommenderService {
    pub fn new(default_top_k: usize, rng: StdRng) -> Self {
        Self {
            current: RwLock::new(None),
            rng: Mutex::new(rng),
            default_top_k,
        }
    }

    pub fn from_config(config: &RecommenderConfig) -> Self {
        // Offset the seed so fallback draws differ from the builder's stream
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self::new(config.default_top_k, rng)
    }

    /// Current snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<ModelState>> {
        self.current.read().clone()
    }

    /// Replace the current snapshot, returning the previous one
    pub fn publish(&self, state: ModelState) -> Option<Arc<ModelState>> {
        let state = Arc::new(state);
        let previous = std::mem::replace(&mut *self.current.write(), Some(state.clone()));

        tracing::info!(
            items = state.item_index().len(),
            catalog_size = state.catalog().len(),
            trained_at = %state.trained_at(),
            "Published new model snapshot"
        );
        previous
    }

    /// Drop the current snapshot; every query returns `[]` until the next publish
    pub fn go_offline(&self) {
        if self.current.write().take().is_some() {
            tracing::warn!("Recommender is now offline");
        }
    }

    pub fn is_offline(&self) -> bool {
        self.current.read().is_none()
    }

    pub fn status(&self) -> EngineStatus {
        match self.snapshot() {
            None => EngineStatus::Offline,
            Some(state) => EngineStatus::Ready {
                items: state.item_index().len(),
                users: state.interactions().num_users(),
                catalog_size: state.catalog().len(),
                latent_dimensions: state.latent_dimensions(),
                source: state.source(),
                trained_at: state.trained_at(),
            },
        }
    }

    /// Recommendations with the configured default size
    pub fn recommend(&self, item_id: &str) -> Vec<String> {
        self.recommend_for(item_id, self.default_top_k)
    }

    /// Up to `top_k` item ids similar to `item_id`, never including it
    pub fn recommend_for(&self, item_id: &str, top_k: usize) -> Vec<String> {
        let Some(state) = self.snapshot() else {
            return Vec::new();
        };
        if state.catalog().is_empty() || top_k == 0 {
            return Vec::new();
        }

        let Some(position) = state.position_of(item_id) else {
            tracing::debug!(item_id, "Item not in trained index");
            return self.random_fallback(&state, item_id, top_k);
        };

        match state.rank_similar(position, top_k) {
            Ok(ranked) if !ranked.is_empty() => ranked,
            Ok(_) => self.random_fallback(&state, item_id, top_k),
            Err(e) => {
                tracing::error!(item_id, error = %e, "Recommendation error");
                self.random_fallback(&state, item_id, top_k)
            }
        }
    }

    fn random_fallback(&self, state: &ModelState, item_id: &str, top_k: usize) -> Vec<String> {
        tracing::warn!(item_id, "Fallback: returning random items");

        let candidates: Vec<&String> = state
            .catalog()
            .iter()
            .filter(|candidate| candidate.as_str() != item_id)
            .collect();
        let amount = top_k.min(candidates.len());

        let mut rng = self.rng.lock();
        candidates
            .choose_multiple(&mut *rng, amount)
            .map(|id| (*id).clone())
            .collect()
    }
}
