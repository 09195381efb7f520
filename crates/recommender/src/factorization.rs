//! Latent factor training via truncated SVD
//!
//! Decomposes the binary user-item matrix `A ≈ U_k Σ_k V_kᵀ` and keeps the
//! `k` strongest components. Users get `U_k Σ_k` as their factor rows and
//! items get `V_k Σ_k`; item-to-item similarity is computed on the latter.

use crate::builder::BuiltMatrix;
use crate::config::RecommenderConfig;
use crate::error::{RecommenderError, Result};
use crate::model::ModelState;
use crate::similarity::{item_similarity_matrix, SimilarityMetric};
use nalgebra::{DMatrix, SVD};
use ndarray::Array2;

const SVD_EPSILON: f64 = 1e-12;
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Latent dimension count for `item_count` columns: `max(1, min(max, items - 1))`
pub fn latent_dimensions(item_count: usize, max_components: usize) -> usize {
    item_count
        .saturating_sub(1)
        .min(max_components)
        .max(1)
}

/// Result of a truncated decomposition
#[derive(Debug, Clone)]
pub struct SvdFactors {
    /// `[num_users x k]`, rows scaled by the singular values
    pub user_factors: Array2<f64>,
    /// `[num_items x k]`, rows scaled by the singular values
    pub item_factors: Array2<f64>,
    /// Retained singular values, descending
    pub singular_values: Vec<f64>,
    /// Share of the squared spectrum kept by the retained components
    pub retained_energy: f64,
}

/// Rank-`components` truncated singular value decomposition
#[derive(Debug, Clone, Copy)]
pub struct TruncatedSvd {
    pub components: usize,
}

impl TruncatedSvd {
    pub fn new(components: usize) -> Self {
        Self { components }
    }

    /// Factor a dense `[users x items]` matrix. Fewer than `components`
    /// factors are returned when the matrix rank bound is smaller.
    pub fn fit(&self, matrix: &Array2<f64>) -> Result<SvdFactors> {
        let (num_users, num_items) = matrix.dim();
        if num_users == 0 || num_items == 0 {
            return Err(RecommenderError::Training(format!(
                "cannot factorize an empty {}x{} matrix",
                num_users, num_items
            )));
        }

        let dense = DMatrix::from_fn(num_users, num_items, |r, c| matrix[[r, c]]);
        let svd = SVD::try_new(dense, true, true, SVD_EPSILON, SVD_MAX_ITERATIONS)
            .ok_or_else(|| RecommenderError::Training("SVD did not converge".to_string()))?;

        let u = svd
            .u
            .ok_or_else(|| RecommenderError::Training("SVD did not produce U".to_string()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| RecommenderError::Training("SVD did not produce Vᵀ".to_string()))?;
        let sigma: Vec<f64> = svd.singular_values.iter().copied().collect();

        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));

        let k = self.components.clamp(1, order.len());
        let kept = &order[..k];

        let mut user_factors = Array2::<f64>::zeros((num_users, k));
        let mut item_factors = Array2::<f64>::zeros((num_items, k));

        for (c, &component) in kept.iter().enumerate() {
            let s = sigma[component];
            for row in 0..num_users {
                user_factors[[row, c]] = u[(row, component)] * s;
            }
            for item in 0..num_items {
                item_factors[[item, c]] = v_t[(component, item)] * s;
            }
        }

        let total_energy: f64 = sigma.iter().map(|s| s * s).sum();
        let kept_energy: f64 = kept.iter().map(|&c| sigma[c] * sigma[c]).sum();
        let retained_energy = if total_energy > 0.0 {
            kept_energy / total_energy
        } else {
            0.0
        };

        Ok(SvdFactors {
            user_factors,
            item_factors,
            singular_values: kept.iter().map(|&c| sigma[c]).collect(),
            retained_energy,
        })
    }
}

/// Turns a built interaction matrix into a publishable [`ModelState`]
#[derive(Debug, Clone)]
pub struct LatentFactorTrainer {
    max_components: usize,
    metric: SimilarityMetric,
}

impl LatentFactorTrainer {
    pub fn new(max_components: usize, metric: SimilarityMetric) -> Self {
        Self {
            max_components: max_components.max(1),
            metric,
        }
    }

    pub fn from_config(config: &RecommenderConfig) -> Self {
        Self::new(config.max_latent_components, config.similarity_metric)
    }

    pub fn train(&self, built: BuiltMatrix) -> Result<ModelState> {
        let BuiltMatrix {
            matrix,
            catalog,
            source,
        } = built;

        let num_users = matrix.num_users();
        let num_items = matrix.num_items();

        let requested = latent_dimensions(num_items, self.max_components);
        let rank_bound = num_users.min(num_items).max(1);
        let k = requested.min(rank_bound);
        if k < requested {
            tracing::warn!(
                requested,
                k,
                num_users,
                num_items,
                "Fewer users than latent dimensions, clamping"
            );
        }

        let factors = TruncatedSvd::new(k).fit(&matrix.to_dense())?;
        tracing::debug!(
            k = factors.singular_values.len(),
            retained_energy = factors.retained_energy,
            "Truncated SVD complete"
        );

        let similarity = item_similarity_matrix(&factors.item_factors, self.metric);

        let state = ModelState::new(
            matrix,
            factors.user_factors,
            factors.item_factors,
            similarity,
            catalog,
            source,
        )?;

        tracing::info!(
            num_users,
            num_items,
            k = state.latent_dimensions(),
            source = ?state.source(),
            "Model trained"
        );

        Ok(state)
    }
}
