//! Cold Start Handling
//!
//! When too little real feedback exists the factorization has nothing to
//! learn from, so the builder swaps the real records for synthetic ones.

use crate::repository::InteractionRecord;
use rand::seq::SliceRandom;
use rand::Rng;

/// Prefix for generated user ids
pub const SYNTHETIC_USER_PREFIX: &str = "synthetic_user_";

/// Parameters of the synthetic interaction generator
#[derive(Debug, Clone, PartialEq)]
pub struct ColdStartPolicy {
    /// Real interaction count at or below which synthetic data replaces it
    pub threshold: usize,
    /// Events generated for every catalog item
    pub per_item_events: usize,
    /// Extra uniformly random events
    pub noise_events: usize,
    /// Size of the synthetic user pool
    pub user_pool_size: usize,
}

impl Default for ColdStartPolicy {
    fn default() -> Self {
        Self {
            threshold: 50,
            per_item_events: 3,
            noise_events: 200,
            user_pool_size: 50,
        }
    }
}

impl ColdStartPolicy {
    /// Whether `real_interactions` is too few to train on
    pub fn applies(&self, real_interactions: usize) -> bool {
        real_interactions <= self.threshold
    }

    /// Generate synthetic interactions for `catalog`
    ///
    /// Steps:
    /// 1. Every catalog item gets `per_item_events` events from random pool users
    /// 2. `noise_events` uniformly random (user, item) events are appended
    ///
    /// Step 1 guarantees every item a column in the resulting matrix.
    pub fn generate<R: Rng + ?Sized>(&self, catalog: &[String], rng: &mut R) -> Vec<InteractionRecord> {
        if catalog.is_empty() {
            return Vec::new();
        }

        let pool = self.user_pool_size.max(1);
        let mut records =
            Vec::with_capacity(catalog.len() * self.per_item_events + self.noise_events);

        for item_id in catalog {
            for _ in 0..self.per_item_events {
                records.push(InteractionRecord::new(synthetic_user(rng, pool), item_id.clone()));
            }
        }

        for _ in 0..self.noise_events {
            if let Some(item_id) = catalog.choose(rng) {
                records.push(InteractionRecord::new(synthetic_user(rng, pool), item_id.clone()));
            }
        }

        records
    }
}

fn synthetic_user<R: Rng + ?Sized>(rng: &mut R, pool: usize) -> String {
    format!("{}{}", SYNTHETIC_USER_PREFIX, rng.gen_range(1..=pool))
}
