//! Item-to-item similarity over latent factor vectors

use ndarray::{Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

/// Similarity metric for comparing item factor vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Pearson,
}

impl SimilarityMetric {
    /// Score between two vectors; degenerate (zero-norm or zero-variance) input scores 0
    pub fn score(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::Pearson => pearson_correlation(a, b),
        }
    }
}

pub fn cosine_similarity(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

pub fn pearson_correlation(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }

    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Pairwise similarity between the rows of `factors`
///
/// The result is `[n x n]` and symmetric with a unit diagonal, aligned to the
/// row order of `factors`.
pub fn item_similarity_matrix(factors: &Array2<f64>, metric: SimilarityMetric) -> Array2<f64> {
    let n = factors.nrows();
    let mut similarity = Array2::<f64>::zeros((n, n));

    // score(a, b) == score(b, a) bit for bit, so every cell can be filled independently
    Zip::indexed(&mut similarity).par_for_each(|(i, j), cell| {
        *cell = if i == j {
            1.0
        } else {
            metric.score(factors.row(i), factors.row(j))
        };
    });

    similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_cosine_similarity() {
        let a = array![1.0, 0.0, 0.0];
        let b = array![1.0, 0.0, 0.0];
        assert!((cosine_similarity(a.view(), b.view()) - 1.0).abs() < 1e-9);

        let c = array![1.0, 0.0, 0.0];
        let d = array![0.0, 1.0, 0.0];
        assert!(cosine_similarity(c.view(), d.view()).abs() < 1e-9);

        let e = array![1.0, 1.0];
        let f = array![-1.0, -1.0];
        assert!((cosine_similarity(e.view(), f.view()) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = Array1::<f64>::zeros(3);
        let a = array![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(zero.view(), a.view()), 0.0);
    }

    #[test]
    fn test_pearson_correlation() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![2.0, 4.0, 6.0];
        assert!((pearson_correlation(a.view(), b.view()) - 1.0).abs() < 1e-9);

        let c = array![3.0, 2.0, 1.0];
        assert!((pearson_correlation(a.view(), c.view()) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_constant_vector_scores_zero() {
        let a = array![1.0, 1.0, 1.0];
        let b = array![1.0, 2.0, 3.0];
        assert_eq!(pearson_correlation(a.view(), b.view()), 0.0);

        let single = array![5.0];
        assert_eq!(pearson_correlation(single.view(), single.view()), 0.0);
    }

    #[test]
    fn test_similarity_matrix_shape_and_symmetry() {
        let factors = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0]];
        let sim = item_similarity_matrix(&factors, SimilarityMetric::Cosine);

        assert_eq!(sim.shape(), &[3, 3]);
        for i in 0..3 {
            assert_eq!(sim[[i, i]], 1.0);
            for j in 0..3 {
                assert_eq!(sim[[i, j]], sim[[j, i]]);
            }
        }
        assert!(sim[[0, 1]] > sim[[0, 2]]);
    }
}
