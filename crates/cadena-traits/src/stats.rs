//! Statistical utility functions shared by scaling, feature engineering and
//! the model adapters.

use ndarray::ArrayView1;

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values at or below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Column statistics used for standardization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    /// The computed mean of the column.
    pub mean: f64,
    /// The population standard deviation (N denominator).
    pub std: f64,
    /// Whether dividing by `std` is meaningful (false for zero variance).
    pub applied: bool,
}

impl ColumnStats {
    /// The divisor to use when scaling: `std`, or 1 for zero-variance columns.
    #[must_use]
    pub const fn divisor(&self) -> f64 {
        if self.applied { self.std } else { 1.0 }
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (N-1 denominator), `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Mean and population standard deviation of a column.
///
/// Returns `None` for an empty column. A column whose standard deviation is
/// at or below [`MIN_STD_THRESHOLD`] is reported with `applied = false`.
///
/// # Examples
///
/// ```
/// use cadena_traits::stats::column_stats;
/// use ndarray::array;
///
/// let col = array![1.0, 2.0, 3.0, 4.0, 5.0];
/// let stats = column_stats(col.view()).unwrap();
///
/// assert!(stats.applied);
/// assert!((stats.mean - 3.0).abs() < 1e-10);
/// ```
pub fn column_stats(values: ArrayView1<'_, f64>) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    Some(ColumnStats {
        mean,
        std,
        applied: std > MIN_STD_THRESHOLD,
    })
}
