//! Leaf-wise boosting with histogram split search.
//!
//! Features are quantized once into at most `max_bin` bins. Each tree grows
//! best-first: the leaf with the largest split gain is split next until the
//! leaf budget is spent, in the style of LightGBM.

use super::binning::BinnedMatrix;
use super::{
    BoostedEnsemble, RegressionTree, check_fraction, leaf_weight, sample_indices, seeded_rng,
    split_gain, squared_loss_gradients,
};
use cadena_traits::model::validate_training_data;
use cadena_traits::{CadenaError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters for leaf-wise boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafwiseParams {
    /// Number of boosting rounds (default: 400)
    pub n_estimators: usize,
    /// Maximum leaves per tree (default: 31)
    pub num_leaves: usize,
    /// Shrinkage applied to every leaf (default: 0.05)
    pub learning_rate: f64,
    /// Minimum rows in each leaf (default: 20)
    pub min_data_in_leaf: usize,
    /// Minimum hessian sum in each leaf (default: 1e-3)
    pub min_sum_hessian_in_leaf: f64,
    /// L2 penalty on leaf weights (default: 0.0)
    pub reg_lambda: f64,
    /// Maximum histogram bins per feature (default: 255)
    pub max_bin: usize,
    /// Optional depth limit (default: unlimited)
    pub max_depth: Option<usize>,
    /// Row fraction sampled per tree (default: 1.0)
    pub bagging_fraction: f64,
    /// Feature fraction sampled per tree (default: 1.0)
    pub feature_fraction: f64,
}

impl Default for LeafwiseParams {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            num_leaves: 31,
            learning_rate: 0.05,
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            reg_lambda: 0.0,
            max_bin: 255,
            max_depth: None,
            bagging_fraction: 1.0,
            feature_fraction: 1.0,
        }
    }
}

impl LeafwiseParams {
    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(CadenaError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if self.num_leaves < 2 {
            return Err(CadenaError::InvalidParameter(format!(
                "num_leaves must be at least 2, got {}",
                self.num_leaves
            )));
        }
        if !(2..=usize::from(u16::MAX)).contains(&self.max_bin) {
            return Err(CadenaError::InvalidParameter(format!(
                "max_bin must lie in [2, {}], got {}",
                u16::MAX,
                self.max_bin
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(CadenaError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [
            ("reg_lambda", self.reg_lambda),
            ("min_sum_hessian_in_leaf", self.min_sum_hessian_in_leaf),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CadenaError::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        check_fraction("bagging_fraction", self.bagging_fraction)?;
        check_fraction("feature_fraction", self.feature_fraction)
    }
}

/// Leaf-wise gradient boosting trainer.
#[derive(Debug, Clone, Default)]
pub struct LeafwiseBooster {
    params: LeafwiseParams,
}

#[derive(Debug, Clone, Copy)]
struct HistSplit {
    feature: usize,
    bin: usize,
    gain: f64,
}

/// A leaf waiting to be split.
struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: Option<HistSplit>,
}

#[derive(Clone, Copy, Default)]
struct Bucket {
    grad: f64,
    hess: f64,
    count: usize,
}

impl LeafwiseBooster {
    /// Create a trainer with the given hyperparameters.
    #[must_use]
    pub const fn new(params: LeafwiseParams) -> Self {
        Self { params }
    }

    /// Get the hyperparameters.
    #[must_use]
    pub const fn params(&self) -> &LeafwiseParams {
        &self.params
    }

    /// Fit an ensemble; bagging and feature sampling are driven by `seed`.
    pub fn fit(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        seed: u64,
    ) -> Result<BoostedEnsemble> {
        validate_training_data(x, y)?;
        self.params.validate()?;

        let n_rows = x.nrows();
        let n_features = x.ncols();
        let base_score = y.mean().unwrap_or(0.0);
        let binned = BinnedMatrix::new(x, self.params.max_bin);

        let mut rng = seeded_rng(seed);
        let mut ensemble = BoostedEnsemble::new(base_score, n_features);
        let mut predictions = Array1::from_elem(n_rows, base_score);

        for round in 0..self.params.n_estimators {
            let grad = squared_loss_gradients(&predictions, y);
            let rows = sample_indices(&mut rng, n_rows, self.params.bagging_fraction);
            let features = sample_indices(&mut rng, n_features, self.params.feature_fraction);

            let tree = self.grow(&binned, &grad, rows, &features);

            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += tree.predict_row(row);
            }
            debug!(round, leaves = tree.n_leaves(), "leafwise tree fitted");
            ensemble.push(tree);
        }

        Ok(ensemble)
    }

    fn grow(
        &self,
        binned: &BinnedMatrix,
        grad: &Array1<f64>,
        rows: Vec<usize>,
        features: &[usize],
    ) -> RegressionTree {
        let root_value = self.shrunk_weight(grad, &rows);
        let mut tree = RegressionTree::leaf(root_value);

        let split = self.best_split(binned, grad, &rows, features, 0);
        let mut open = vec![OpenLeaf {
            node: 0,
            rows,
            depth: 0,
            split,
        }];
        let mut n_leaves = 1;

        while n_leaves < self.params.num_leaves {
            // Ties go to the earliest leaf
            let mut pick: Option<(usize, f64)> = None;
            for (pos, leaf) in open.iter().enumerate() {
                if let Some(split) = leaf.split
                    && pick.is_none_or(|(_, gain)| split.gain > gain)
                {
                    pick = Some((pos, split.gain));
                }
            }
            let Some((pos, _)) = pick else {
                break;
            };

            let leaf = open.remove(pos);
            let Some(split) = leaf.split else {
                break;
            };
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .into_iter()
                .partition(|&i| binned.bin(i, split.feature) <= split.bin);

            let threshold = binned.mapper(split.feature).upper_bound(split.bin);
            let (left, right) = tree.split_leaf(
                leaf.node,
                split.feature,
                threshold,
                self.shrunk_weight(grad, &left_rows),
                self.shrunk_weight(grad, &right_rows),
            );
            n_leaves += 1;

            let depth = leaf.depth + 1;
            for (node, rows) in [(left, left_rows), (right, right_rows)] {
                let split = self.best_split(binned, grad, &rows, features, depth);
                open.push(OpenLeaf {
                    node,
                    rows,
                    depth,
                    split,
                });
            }
        }

        tree
    }

    fn best_split(
        &self,
        binned: &BinnedMatrix,
        grad: &Array1<f64>,
        rows: &[usize],
        features: &[usize],
        depth: usize,
    ) -> Option<HistSplit> {
        if self.params.max_depth.is_some_and(|max| depth >= max) {
            return None;
        }
        let min_data = self.params.min_data_in_leaf.max(1);
        if rows.len() < 2 * min_data {
            return None;
        }

        let g_total: f64 = rows.iter().map(|&i| grad[i]).sum();
        // Unit hessian per row for squared loss
        let h_total = rows.len() as f64;

        let mut best: Option<HistSplit> = None;
        for &feature in features {
            let n_bins = binned.mapper(feature).n_bins();
            let mut hist = vec![Bucket::default(); n_bins];
            for &i in rows {
                let bucket = &mut hist[binned.bin(i, feature)];
                bucket.grad += grad[i];
                bucket.hess += 1.0;
                bucket.count += 1;
            }

            let mut left = Bucket::default();
            for (bin, bucket) in hist.iter().enumerate().take(n_bins - 1) {
                left.grad += bucket.grad;
                left.hess += bucket.hess;
                left.count += bucket.count;
                if bucket.count == 0 {
                    continue;
                }

                let right_count = rows.len() - left.count;
                let right_hess = h_total - left.hess;
                if left.count < min_data || right_count < min_data {
                    continue;
                }
                if left.hess < self.params.min_sum_hessian_in_leaf
                    || right_hess < self.params.min_sum_hessian_in_leaf
                {
                    continue;
                }

                let gain = split_gain(
                    (left.grad, left.hess),
                    (g_total - left.grad, right_hess),
                    self.params.reg_lambda,
                );
                if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                    best = Some(HistSplit { feature, bin, gain });
                }
            }
        }

        best
    }

    fn shrunk_weight(&self, grad: &Array1<f64>, rows: &[usize]) -> f64 {
        let g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let h = rows.len() as f64;
        self.params.learning_rate * leaf_weight(g, h, self.params.reg_lambda)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_traits::Regressor;
    use ndarray::{Array2, array};

    fn wave_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let t = i as f64 / n as f64;
            if j == 0 { t } else { (t * 7.0).cos() }
        });
        let y = x.column(0).mapv(|t| (t * 6.0).sin());
        (x, y)
    }

    fn mse(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        (a - b).mapv(|d| d * d).mean().unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = LeafwiseParams::default();
        assert_eq!(params.n_estimators, 400);
        assert_eq!(params.num_leaves, 31);
        assert_eq!(params.max_bin, 255);
        assert!(params.max_depth.is_none());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_fits_smooth_curve() {
        let (x, y) = wave_data(400);
        let model = LeafwiseBooster::default().fit(x.view(), y.view(), 42).unwrap();
        let preds = model.predict(x.view()).unwrap();

        let baseline = y.var(0.0);
        assert!(mse(&preds, &y) < 0.05 * baseline);
    }

    #[test]
    fn test_leaf_budget_and_depth() {
        let (x, y) = wave_data(400);
        let params = LeafwiseParams {
            n_estimators: 3,
            num_leaves: 4,
            max_depth: Some(2),
            ..Default::default()
        };
        let model = LeafwiseBooster::new(params).fit(x.view(), y.view(), 0).unwrap();
        for tree in model.trees() {
            assert!(tree.n_leaves() <= 4);
            assert!(tree.depth() <= 2);
        }
    }

    #[test]
    fn test_min_data_blocks_splits() {
        let (x, y) = wave_data(30);
        let params = LeafwiseParams {
            n_estimators: 2,
            ..Default::default()
        };
        // 30 rows cannot be split into two leaves of 20
        let model = LeafwiseBooster::new(params).fit(x.view(), y.view(), 0).unwrap();
        assert!(model.trees().iter().all(|t| t.n_leaves() == 1));
    }

    #[test]
    fn test_seeded_bagging_is_deterministic() {
        let (x, y) = wave_data(200);
        let params = LeafwiseParams {
            n_estimators: 15,
            bagging_fraction: 0.6,
            feature_fraction: 0.5,
            ..Default::default()
        };
        let a = LeafwiseBooster::new(params.clone()).fit(x.view(), y.view(), 3).unwrap();
        let b = LeafwiseBooster::new(params).fit(x.view(), y.view(), 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_params() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        let params = LeafwiseParams {
            num_leaves: 1,
            ..Default::default()
        };
        assert!(matches!(
            LeafwiseBooster::new(params).fit(x.view(), y.view(), 0),
            Err(CadenaError::InvalidParameter(_))
        ));
    }
}
