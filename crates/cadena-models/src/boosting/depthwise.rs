//! Depth-wise boosting with exact greedy split search.
//!
//! Every candidate split of every sampled feature is scored by sorting the
//! node's rows on that feature, in the style of XGBoost's exact tree method.

use super::{
    BoostedEnsemble, RegressionTree, check_fraction, leaf_weight, sample_indices, seeded_rng,
    split_gain, squared_loss_gradients,
};
use cadena_traits::model::validate_training_data;
use cadena_traits::{CadenaError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyperparameters for depth-wise boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthwiseParams {
    /// Number of boosting rounds (default: 200)
    pub n_estimators: usize,
    /// Maximum tree depth (default: 4)
    pub max_depth: usize,
    /// Shrinkage applied to every leaf (default: 0.05)
    pub learning_rate: f64,
    /// L2 penalty on leaf weights (default: 1.0)
    pub reg_lambda: f64,
    /// Minimum gain required to split (default: 0.0)
    pub gamma: f64,
    /// Minimum hessian sum in each child (default: 1.0)
    pub min_child_weight: f64,
    /// Row fraction sampled per tree (default: 1.0)
    pub subsample: f64,
    /// Feature fraction sampled per tree (default: 1.0)
    pub colsample_bytree: f64,
}

impl Default for DepthwiseParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 4,
            learning_rate: 0.05,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
        }
    }
}

impl DepthwiseParams {
    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(CadenaError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(CadenaError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [
            ("reg_lambda", self.reg_lambda),
            ("gamma", self.gamma),
            ("min_child_weight", self.min_child_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CadenaError::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        check_fraction("subsample", self.subsample)?;
        check_fraction("colsample_bytree", self.colsample_bytree)
    }
}

/// Depth-wise gradient boosting trainer.
#[derive(Debug, Clone, Default)]
pub struct DepthwiseBooster {
    params: DepthwiseParams,
}

/// Best split found for a node.
struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DepthwiseBooster {
    /// Create a trainer with the given hyperparameters.
    #[must_use]
    pub const fn new(params: DepthwiseParams) -> Self {
        Self { params }
    }

    /// Get the hyperparameters.
    #[must_use]
    pub const fn params(&self) -> &DepthwiseParams {
        &self.params
    }

    /// Fit an ensemble; all row and column sampling is driven by `seed`.
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

        let mut rng = seeded_rng(seed);
        let mut ensemble = BoostedEnsemble::new(base_score, n_features);
        let mut predictions = Array1::from_elem(n_rows, base_score);
        // Hessian is constant for squared loss
        let hess = Array1::<f64>::ones(n_rows);

        for round in 0..self.params.n_estimators {
            let grad = squared_loss_gradients(&predictions, y);
            let rows = sample_indices(&mut rng, n_rows, self.params.subsample);
            let features = sample_indices(&mut rng, n_features, self.params.colsample_bytree);

            let mut tree = RegressionTree::leaf(0.0);
            self.grow(x, &grad, &hess, &mut tree, 0, rows, &features, 0);

            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += tree.predict_row(row);
            }
            debug!(round, leaves = tree.n_leaves(), "depthwise tree fitted");
            ensemble.push(tree);
        }

        Ok(ensemble)
    }

    #[allow(clippy::too_many_arguments)]
    fn grow(
        &self,
        x: ArrayView2<'_, f64>,
        grad: &Array1<f64>,
        hess: &Array1<f64>,
        tree: &mut RegressionTree,
        node: usize,
        rows: Vec<usize>,
        features: &[usize],
        depth: usize,
    ) {
        let g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| hess[i]).sum();
        tree.set_leaf_value(node, self.shrunk_weight(g, h));

        if depth >= self.params.max_depth {
            return;
        }
        let Some(choice) = self.best_split(x, grad, hess, &rows, features, (g, h)) else {
            return;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| x[[i, choice.feature]] <= choice.threshold);

        let (left, right) = tree.split_leaf(node, choice.feature, choice.threshold, 0.0, 0.0);
        self.grow(x, grad, hess, tree, left, left_rows, features, depth + 1);
        self.grow(x, grad, hess, tree, right, right_rows, features, depth + 1);
    }

    fn best_split(
        &self,
        x: ArrayView2<'_, f64>,
        grad: &Array1<f64>,
        hess: &Array1<f64>,
        rows: &[usize],
        features: &[usize],
        totals: (f64, f64),
    ) -> Option<SplitChoice> {
        let (g_total, h_total) = totals;
        if h_total < 2.0 * self.params.min_child_weight || rows.len() < 2 {
            return None;
        }

        let mut best: Option<SplitChoice> = None;
        let mut order = rows.to_vec();

        for &feature in features {
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut gl = 0.0;
            let mut hl = 0.0;
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                gl += grad[i];
                hl += hess[i];

                let value = x[[i, feature]];
                let next = x[[order[pos + 1], feature]];
                if value == next {
                    continue;
                }
                let hr = h_total - hl;
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }

                let gain = split_gain((gl, hl), (g_total - gl, hr), self.params.reg_lambda)
                    - self.params.gamma;
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(SplitChoice {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn shrunk_weight(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        self.params.learning_rate * leaf_weight(grad_sum, hess_sum, self.params.reg_lambda)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::Node;
    use cadena_traits::Regressor;
    use ndarray::{Array2, array};

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = Array1::from_iter((0..40).map(|i| if i < 20 { -1.0 } else { 1.0 }));
        (x, y)
    }

    fn mse(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        (a - b).mapv(|d| d * d).mean().unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = DepthwiseParams::default();
        assert_eq!(params.n_estimators, 200);
        assert_eq!(params.max_depth, 4);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let model = DepthwiseBooster::default().fit(x.view(), y.view(), 42).unwrap();
        let preds = model.predict(x.view()).unwrap();

        assert_eq!(model.trees().len(), 200);
        assert!(mse(&preds, &y) < 0.01);
        // First split isolates the step on feature 0
        assert!(matches!(
            model.trees()[0].nodes()[0],
            Node::Split { feature: 0, threshold, .. } if (threshold - 19.5).abs() < 1e-12
        ));
    }

    #[test]
    fn test_depth_limit() {
        let (x, y) = step_data();
        let params = DepthwiseParams {
            n_estimators: 5,
            max_depth: 2,
            ..Default::default()
        };
        let model = DepthwiseBooster::new(params).fit(x.view(), y.view(), 1).unwrap();
        assert!(model.trees().iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn test_seeded_sampling_is_deterministic() {
        let (x, y) = step_data();
        let params = DepthwiseParams {
            n_estimators: 20,
            subsample: 0.7,
            colsample_bytree: 0.5,
            ..Default::default()
        };
        let a = DepthwiseBooster::new(params.clone()).fit(x.view(), y.view(), 9).unwrap();
        let b = DepthwiseBooster::new(params).fit(x.view(), y.view(), 9).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_target_gives_base_score() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.5, 0.5, 0.5];
        let model = DepthwiseBooster::default().fit(x.view(), y.view(), 0).unwrap();
        let preds = model.predict(x.view()).unwrap();
        assert!(preds.iter().all(|p| (p - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_invalid_params() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        let params = DepthwiseParams {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            DepthwiseBooster::new(params).fit(x.view(), y.view(), 0),
            Err(CadenaError::InvalidParameter(_))
        ));
    }
}
