//! Published model snapshot
//!
//! A [`ModelState`] is assembled completely by the trainer and then shared
//! read-only behind an `Arc`. A retrain never edits it; it builds a new one.

use crate::error::{RecommenderError, Result};
use crate::matrix::InteractionMatrix;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Where the training interactions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingSource {
    /// Real interactions fetched from the repository
    Observed,
    /// Cold-start synthetic interactions
    Synthetic,
}

/// Immutable trained model
#[derive(Debug, Clone)]
pub struct ModelState {
    interactions: InteractionMatrix,
    /// `[num_users x k]`
    user_factors: Array2<f64>,
    /// `[num_items x k]`
    item_factors: Array2<f64>,
    /// `[num_items x num_items]`, aligned to `item_index`
    similarity: Array2<f64>,
    item_index: Vec<String>,
    positions: HashMap<String, usize>,
    catalog: Vec<String>,
    source: TrainingSource,
    trained_at: DateTime<Utc>,
}

impl ModelState {
    /// Assemble a snapshot, checking that every structure agrees on the item axis
    pub fn new(
        interactions: InteractionMatrix,
        user_factors: Array2<f64>,
        item_factors: Array2<f64>,
        similarity: Array2<f64>,
        catalog: Vec<String>,
        source: TrainingSource,
    ) -> Result<Self> {
        let items = interactions.num_items();

        if similarity.nrows() != items || similarity.ncols() != items {
            return Err(RecommenderError::Internal(format!(
                "similarity is {}x{} but the matrix has {} items",
                similarity.nrows(),
                similarity.ncols(),
                items
            )));
        }
        if item_factors.nrows() != items {
            return Err(RecommenderError::Internal(format!(
                "item factors have {} rows for {} items",
                item_factors.nrows(),
                items
            )));
        }
        if user_factors.nrows() != interactions.num_users() {
            return Err(RecommenderError::Internal(format!(
                "user factors have {} rows for {} users",
                user_factors.nrows(),
                interactions.num_users()
            )));
        }
        if user_factors.ncols() != item_factors.ncols() {
            return Err(RecommenderError::Internal(
                "user and item factors disagree on latent dimensions".to_string(),
            ));
        }

        let item_index = interactions.item_ids().to_vec();
        let positions = item_index
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();

        Ok(Self {
            interactions,
            user_factors,
            item_factors,
            similarity,
            item_index,
            positions,
            catalog,
            source,
            trained_at: Utc::now(),
        })
    }

    pub fn interactions(&self) -> &InteractionMatrix {
        &self.interactions
    }

    pub fn user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Array2<f64> {
        &self.item_factors
    }

    pub fn similarity(&self) -> &Array2<f64> {
        &self.similarity
    }

    pub fn item_index(&self) -> &[String] {
        &self.item_index
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub fn source(&self) -> TrainingSource {
        self.source
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Number of latent dimensions
    pub fn latent_dimensions(&self) -> usize {
        self.item_factors.ncols()
    }

    pub fn position_of(&self, item_id: &str) -> Option<usize> {
        self.positions.get(item_id).copied()
    }

    /// Whether all structures agree on the item axis
    pub fn is_consistent(&self) -> bool {
        let n = self.item_index.len();
        n == self.interactions.num_items()
            && n == self.similarity.nrows()
            && n == self.similarity.ncols()
            && n == self.item_factors.nrows()
    }

    /// Up to `top_k` item ids most similar to the item at `position`
    ///
    /// Other items are ordered by descending score; ties keep ascending index
    /// order and NaN scores sort last. The item itself is never included.
    pub fn rank_similar(&self, position: usize, top_k: usize) -> Result<Vec<String>> {
        if position >= self.similarity.nrows() {
            return Err(RecommenderError::Computation(format!(
                "row {} out of range for {} items",
                position,
                self.similarity.nrows()
            )));
        }

        let row = self.similarity.row(position);
        let mut candidates: Vec<(usize, f64)> = row
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != position)
            .map(|(idx, &score)| (idx, if score.is_nan() { f64::NEG_INFINITY } else { score }))
            .collect();

        candidates.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        candidates
            .into_iter()
            .take(top_k)
            .map(|(idx, _)| {
                self.item_index.get(idx).cloned().ok_or_else(|| {
                    RecommenderError::Computation(format!("index {} has no item id", idx))
                })
            })
            .collect()
    }
}
