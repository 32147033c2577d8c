//! Forecast error metrics.

use cadena_traits::{CadenaError, Regressor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Out-of-sample error of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Model predictions, one per evaluated row
    pub predictions: Array1<f64>,
}

fn check_pair(predictions: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<()> {
    if actual.is_empty() {
        return Err(CadenaError::NoData("no rows to evaluate".to_string()));
    }
    if predictions.len() != actual.len() {
        return Err(CadenaError::DimensionMismatch {
            expected: actual.len(),
            got: predictions.len(),
        });
    }
    Ok(())
}

/// Root mean squared error, `sqrt(mean((p - y)^2))`.
pub fn rmse(predictions: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(predictions, actual)?;
    let mse = predictions
        .iter()
        .zip(actual.iter())
        .map(|(p, y)| (p - y).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    Ok(mse.sqrt())
}

/// Mean absolute error, `mean(|p - y|)`.
pub fn mae(predictions: ArrayView1<'_, f64>, actual: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(predictions, actual)?;
    Ok(predictions
        .iter()
        .zip(actual.iter())
        .map(|(p, y)| (p - y).abs())
        .sum::<f64>()
        / actual.len() as f64)
}

/// Predicts `x` with `model` and scores the predictions against `y`.
pub fn evaluate(
    model: &dyn Regressor,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
) -> Result<Evaluation> {
    if x.nrows() == 0 || y.is_empty() {
        return Err(CadenaError::NoData("no rows to evaluate".to_string()));
    }
    if x.nrows() != y.len() {
        return Err(CadenaError::DimensionMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }

    let predictions = model.predict(x)?;
    Ok(Evaluation {
        rmse: rmse(predictions.view(), y)?,
        mae: mae(predictions.view(), y)?,
        predictions,
    })
}
