//! Gradient-boosted regression trees on squared loss.
//!
//! Two growth strategies share one ensemble representation:
//! - [`depthwise`]: exact greedy splits, trees grown level by level to a depth limit
//! - [`leafwise`]: histogram splits, trees grown best-first to a leaf budget
//!
//! Both use second-order statistics. For squared loss the gradient of a row is
//! `prediction - target` and the hessian is 1.

pub mod binning;
pub mod depthwise;
pub mod leafwise;
mod tree;

pub use depthwise::{DepthwiseBooster, DepthwiseParams};
pub use leafwise::{LeafwiseBooster, LeafwiseParams};
pub use tree::{Node, RegressionTree};

use cadena_traits::model::ensure_columns;
use cadena_traits::{CadenaError, Regressor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// An additive ensemble of regression trees.
///
/// Predictions are `base_score + sum(tree outputs)`; leaf values already
/// include the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedEnsemble {
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl BoostedEnsemble {
    pub(crate) const fn new(base_score: f64, n_features: usize) -> Self {
        Self {
            base_score,
            trees: Vec::new(),
            n_features,
        }
    }

    pub(crate) fn push(&mut self, tree: RegressionTree) {
        self.trees.push(tree);
    }

    /// Initial prediction before any tree.
    #[must_use]
    pub const fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Fitted trees in boosting order.
    #[must_use]
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Prediction for one row.
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    /// Checks every tree against the feature count; used after loading.
    pub fn validate(&self) -> Result<()> {
        if !self.base_score.is_finite() {
            return Err(CadenaError::InvalidData(format!(
                "base score {} is not finite",
                self.base_score
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features).map_err(|e| {
                CadenaError::InvalidData(format!("tree {i}: {e}"))
            })?;
        }
        Ok(())
    }
}

impl Regressor for BoostedEnsemble {
    fn name(&self) -> &str {
        "boosted_trees"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        ensure_columns(self.n_features, x)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }
}

/// Optimal leaf weight `-G / (H + lambda)`.
pub(crate) fn leaf_weight(grad_sum: f64, hess_sum: f64, reg_lambda: f64) -> f64 {
    let denom = hess_sum + reg_lambda;
    if denom <= 0.0 { 0.0 } else { -grad_sum / denom }
}

/// Structure score `G^2 / (H + lambda)` of a node.
fn node_score(grad_sum: f64, hess_sum: f64, reg_lambda: f64) -> f64 {
    let denom = hess_sum + reg_lambda;
    if denom <= 0.0 { 0.0 } else { grad_sum * grad_sum / denom }
}

/// Loss reduction from splitting a node into left and right children.
pub(crate) fn split_gain(
    left: (f64, f64),
    right: (f64, f64),
    reg_lambda: f64,
) -> f64 {
    let (gl, hl) = left;
    let (gr, hr) = right;
    0.5 * (node_score(gl, hl, reg_lambda) + node_score(gr, hr, reg_lambda)
        - node_score(gl + gr, hl + hr, reg_lambda))
}

/// Squared-loss gradients for the current predictions.
pub(crate) fn squared_loss_gradients(predictions: &Array1<f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
    predictions - &y
}

/// Seeded source for row and column sampling.
pub(crate) fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draws `round(fraction * n)` sorted indices out of `0..n`, or all of them
/// when `fraction >= 1`.
pub(crate) fn sample_indices(rng: &mut StdRng, n: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 || n == 0 {
        return (0..n).collect();
    }
    let amount = ((n as f64 * fraction).round() as usize).clamp(1, n);
    let mut picked = sample(rng, n, amount).into_vec();
    picked.sort_unstable();
    picked
}

/// Validates a sampling fraction in `(0, 1]`.
pub(crate) fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(CadenaError::InvalidParameter(format!(
            "{name} must lie in (0, 1], got {value}"
        )))
    }
}
