//! Horizon shifting of the target.
//!
//! Forecasting `h` rows ahead pairs the features of row `i` with the target
//! of row `i + h`. The final `h` rows have no future target and are dropped
//! together with their feature rows.

use cadena_traits::{CadenaError, Date, FeatureTable, Horizon, Result};
use ndarray::{Array1, ArrayView1, ArrayView2, s};

/// Returns `target[h..]`, the target seen `h` rows into the future.
///
/// Fails with `InsufficientData` when no row would remain.
pub fn shift_target(target: ArrayView1<'_, f64>, horizon: Horizon) -> Result<Array1<f64>> {
    let h = horizon.days();
    if h >= target.len() {
        return Err(CadenaError::InsufficientData(format!(
            "horizon {h} leaves no rows in a table of {} rows",
            target.len()
        )));
    }
    Ok(target.slice(s![h..]).to_owned())
}

/// Features, dates and shifted target for one horizon, row-aligned.
#[derive(Debug, Clone)]
pub struct HorizonFrame<'a> {
    horizon: Horizon,
    dates: &'a [Date],
    features: ArrayView2<'a, f64>,
    target: Array1<f64>,
}

impl<'a> HorizonFrame<'a> {
    /// The horizon this frame was built for.
    pub const fn horizon(&self) -> Horizon {
        self.horizon
    }

    /// Number of aligned rows, `N - h`.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Dates of the feature rows.
    pub const fn dates(&self) -> &'a [Date] {
        self.dates
    }

    /// Truncated feature matrix.
    pub const fn features(&self) -> ArrayView2<'a, f64> {
        self.features
    }

    /// Shifted target.
    pub fn target(&self) -> ArrayView1<'_, f64> {
        self.target.view()
    }
}

/// Shifts the target and truncates features and dates to match.
pub fn align_horizon(table: &FeatureTable, horizon: Horizon) -> Result<HorizonFrame<'_>> {
    let target = shift_target(table.target().view(), horizon)?;
    let n = target.len();

    Ok(HorizonFrame {
        horizon,
        dates: &table.dates()[..n],
        features: table.features().slice(s![..n, ..]),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn table(n: usize) -> FeatureTable {
        let start = Date::from_ymd_opt(2020, 1, 1).unwrap();
        let dates = (0..n)
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        let target = Array1::from_iter((0..n).map(|i| i as f64));
        let features = Array2::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f64);
        FeatureTable::new(
            dates,
            target,
            features,
            vec!["a".to_string(), "b".to_string()],
            "y",
        )
        .unwrap()
    }

    #[test]
    fn test_shift_target() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let shifted = shift_target(y.view(), Horizon::new(1).unwrap()).unwrap();
        assert_eq!(shifted, array![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_align_lengths_for_every_horizon() {
        let t = table(30);
        for h in [1, 5, 20, 29] {
            let frame = align_horizon(&t, Horizon::new(h).unwrap()).unwrap();
            assert_eq!(frame.len(), 30 - h);
            assert_eq!(frame.features().nrows(), 30 - h);
            assert_eq!(frame.dates().len(), 30 - h);
            // Row i of the features is paired with target i + h
            assert_eq!(frame.target()[0], h as f64);
            assert_eq!(frame.features()[[0, 0]], 0.0);
        }
    }

    #[test]
    fn test_horizon_too_long() {
        let t = table(20);
        let err = align_horizon(&t, Horizon::new(20).unwrap()).unwrap_err();
        assert!(matches!(err, CadenaError::InsufficientData(_)));
    }
}
