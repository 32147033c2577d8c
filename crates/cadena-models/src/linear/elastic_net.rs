//! ElasticNet regression fitted by cyclic coordinate descent.

use cadena_traits::model::{ensure_columns, validate_training_data};
use cadena_traits::stats::MIN_STD_THRESHOLD;
use cadena_traits::{CadenaError, Regressor, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for ElasticNet regression.
///
/// The objective is
/// `1/(2n) * ||y - Xw - b||^2 + alpha * l1_ratio * ||w||_1 + alpha * (1 - l1_ratio) / 2 * ||w||^2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticNetConfig {
    /// Overall regularization strength (default: 0.01)
    pub alpha: f64,
    /// Mix between L1 and L2 penalties, 0 = ridge, 1 = lasso (default: 0.5)
    pub l1_ratio: f64,
    /// Iteration cap for coordinate descent (default: 5000)
    pub max_iter: usize,
    /// Relative coefficient-change tolerance (default: 1e-4)
    pub tol: f64,
    /// Whether to fit an intercept (default: true)
    pub fit_intercept: bool,
    /// Fail instead of warning when `max_iter` is reached (default: false)
    pub strict_convergence: bool,
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            l1_ratio: 0.5,
            max_iter: 5000,
            tol: 1e-4,
            fit_intercept: true,
            strict_convergence: false,
        }
    }
}

impl ElasticNetConfig {
    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(CadenaError::InvalidParameter(format!(
                "alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(CadenaError::InvalidParameter(format!(
                "l1_ratio must lie in [0, 1], got {}",
                self.l1_ratio
            )));
        }
        if self.max_iter == 0 {
            return Err(CadenaError::InvalidParameter(
                "max_iter must be positive".to_string(),
            ));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(CadenaError::InvalidParameter(format!(
                "tol must be positive, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// ElasticNet trainer.
///
/// # Example
///
/// ```
/// use cadena_models::linear::{ElasticNet, ElasticNetConfig};
/// use cadena_traits::Regressor;
/// use ndarray::array;
///
/// let x = array![[1.0], [2.0], [3.0], [4.0]];
/// let y = array![2.0, 4.0, 6.0, 8.0];
///
/// let model = ElasticNet::new(ElasticNetConfig::default()).fit(x.view(), y.view()).unwrap();
/// let preds = model.predict(x.view()).unwrap();
/// assert_eq!(preds.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ElasticNet {
    config: ElasticNetConfig,
}

impl ElasticNet {
    /// Create a trainer with the given configuration.
    #[must_use]
    pub const fn new(config: ElasticNetConfig) -> Self {
        Self { config }
    }

    /// Get the trainer configuration.
    #[must_use]
    pub const fn config(&self) -> &ElasticNetConfig {
        &self.config
    }

    /// Fit the model on `x` (rows × features) and `y`.
    pub fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<ElasticNetModel> {
        validate_training_data(x, y)?;
        self.config.validate()?;

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();

        let (x_centered, y_centered, x_mean, y_mean) = if self.config.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| CadenaError::NoData("empty training matrix".to_string()))?;
            let y_mean = y
                .mean()
                .ok_or_else(|| CadenaError::NoData("empty training target".to_string()))?;
            (&x - &x_mean, &y - y_mean, x_mean, y_mean)
        } else {
            (x.to_owned(), y.to_owned(), Array1::zeros(n_features), 0.0)
        };

        let l1_penalty = self.config.alpha * self.config.l1_ratio * n_samples;
        let l2_penalty = self.config.alpha * (1.0 - self.config.l1_ratio) * n_samples;

        let col_norms: Vec<f64> = x_centered
            .columns()
            .into_iter()
            .map(|col| col.dot(&col))
            .collect();

        let (coefficients, n_iter, converged) =
            coordinate_descent(&x_centered, y_centered, &col_norms, l1_penalty, l2_penalty, &self.config);

        if !converged {
            if self.config.strict_convergence {
                return Err(CadenaError::NotConverged { iterations: n_iter });
            }
            warn!(
                iterations = n_iter,
                "elastic net reached max_iter without converging"
            );
        }

        let intercept = if self.config.fit_intercept {
            y_mean - x_mean.dot(&coefficients)
        } else {
            0.0
        };

        debug!(
            iterations = n_iter,
            nonzero = coefficients.iter().filter(|w| w.abs() > 0.0).count(),
            "elastic net fitted"
        );

        Ok(ElasticNetModel {
            coefficients,
            intercept,
            n_iter,
            converged,
        })
    }
}

/// Runs coordinate descent, returning coefficients, iterations and convergence.
fn coordinate_descent(
    x: &Array2<f64>,
    mut residual: Array1<f64>,
    col_norms: &[f64],
    l1_penalty: f64,
    l2_penalty: f64,
    config: &ElasticNetConfig,
) -> (Array1<f64>, usize, bool) {
    let mut coef = Array1::<f64>::zeros(x.ncols());

    for iter in 1..=config.max_iter {
        let mut max_delta = 0.0_f64;
        let mut max_coef = 0.0_f64;

        for (j, column) in x.columns().into_iter().enumerate() {
            let denom = col_norms[j] + l2_penalty;
            if col_norms[j] <= MIN_STD_THRESHOLD || denom <= 0.0 {
                continue;
            }

            let old = coef[j];
            let rho = column.dot(&residual) + old * col_norms[j];
            let new = soft_threshold(rho, l1_penalty) / denom;

            if new != old {
                residual.scaled_add(old - new, &column);
                coef[j] = new;
            }

            max_delta = max_delta.max((new - old).abs());
            max_coef = max_coef.max(new.abs());
        }

        if max_coef == 0.0 || max_delta / max_coef < config.tol {
            return (coef, iter, true);
        }
    }

    (coef, config.max_iter, false)
}

/// Soft thresholding operator.
fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

/// A fitted ElasticNet model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetModel {
    coefficients: Array1<f64>,
    intercept: f64,
    n_iter: usize,
    converged: bool,
}

impl ElasticNetModel {
    /// Fitted coefficients, one per predictor.
    pub const fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    /// Fitted intercept.
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Number of coordinate descent sweeps performed.
    pub const fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Whether the solver met its tolerance.
    pub const fn converged(&self) -> bool {
        self.converged
    }

    /// Number of non-zero coefficients.
    pub fn n_nonzero(&self) -> usize {
        self.coefficients.iter().filter(|w| w.abs() > 0.0).count()
    }
}

impl Regressor for ElasticNetModel {
    fn name(&self) -> &str {
        "elastic_net"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        ensure_columns(self.coefficients.len(), x)?;
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}
