//! Regressor trait for fitted forecasting models.
//!
//! This module defines the `Regressor` trait implemented by every fitted model
//! in the workspace, and the input checks shared by the training adapters.

use crate::{CadenaError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// A fitted regression model.
///
/// Implementations should be thread-safe (`Send + Sync`) so that fitted models
/// can be shared freely once training is done.
///
/// # Example
///
/// ```no_run
/// use cadena_traits::{Regressor, Result};
/// use ndarray::{Array1, ArrayView2};
///
/// struct MeanModel {
///     mean: f64,
///     n_features: usize,
/// }
///
/// impl Regressor for MeanModel {
///     fn name(&self) -> &str {
///         "mean"
///     }
///
///     fn n_features(&self) -> usize {
///         self.n_features
///     }
///
///     fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
///         cadena_traits::model::ensure_columns(self.n_features, x)?;
///         Ok(Array1::from_elem(x.nrows(), self.mean))
///     }
/// }
/// ```
pub trait Regressor: Send + Sync {
    /// Returns the name of the model family that produced this model.
    fn name(&self) -> &str;

    /// Number of predictor columns the model was trained on.
    fn n_features(&self) -> usize;

    /// Predicts one value per row of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`CadenaError::DimensionMismatch`] if `x` has a different
    /// number of columns than the training matrix.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

/// Checks that a prediction matrix has the expected column count.
pub fn ensure_columns(expected: usize, x: ArrayView2<'_, f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(CadenaError::DimensionMismatch {
            expected,
            got: x.ncols(),
        });
    }
    Ok(())
}

/// Validates a training matrix and target before fitting.
///
/// Requires at least one row, matching row counts, and finite values.
pub fn validate_training_data(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(CadenaError::NoData("training matrix has no rows".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(CadenaError::DimensionMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(CadenaError::InvalidData(
            "training matrix contains non-finite values".to_string(),
        ));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(CadenaError::InvalidData(
            "training target contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
