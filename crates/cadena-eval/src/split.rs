//! Chronological train/test splitting.

use crate::shift::HorizonFrame;
use cadena_traits::{CadenaError, Date, Result};
use ndarray::{ArrayView1, ArrayView2, s};

/// Splits rows into a training prefix and a test suffix without shuffling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChronologicalSplit {
    train_fraction: f64,
}

impl Default for ChronologicalSplit {
    fn default() -> Self {
        Self { train_fraction: 0.8 }
    }
}

/// Borrowed training and test partitions of a [`HorizonFrame`].
#[derive(Debug, Clone)]
pub struct SplitData<'a> {
    /// Training features.
    pub x_train: ArrayView2<'a, f64>,
    /// Training target.
    pub y_train: ArrayView1<'a, f64>,
    /// Test features.
    pub x_test: ArrayView2<'a, f64>,
    /// Test target.
    pub y_test: ArrayView1<'a, f64>,
    /// Training row dates.
    pub train_dates: &'a [Date],
    /// Test row dates.
    pub test_dates: &'a [Date],
}

impl ChronologicalSplit {
    /// Creates a splitter; `train_fraction` must lie strictly between 0 and 1.
    pub fn new(train_fraction: f64) -> Result<Self> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(CadenaError::InvalidParameter(format!(
                "train fraction must lie in (0, 1), got {train_fraction}"
            )));
        }
        Ok(Self { train_fraction })
    }

    /// Fraction of rows assigned to training.
    pub const fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// First test row, `floor(train_fraction * n)`.
    pub fn boundary(&self, n: usize) -> usize {
        (self.train_fraction * n as f64).floor() as usize
    }

    /// Splits a horizon frame at [`Self::boundary`].
    ///
    /// Fails with `InsufficientData` if either partition would be empty.
    pub fn split<'a>(&self, frame: &'a HorizonFrame<'a>) -> Result<SplitData<'a>> {
        let n = frame.len();
        let boundary = self.boundary(n);
        if boundary == 0 || boundary >= n {
            return Err(CadenaError::InsufficientData(format!(
                "{n} rows give an empty partition at split boundary {boundary}"
            )));
        }

        let features = frame.features();
        let target = frame.target();
        let dates = frame.dates();

        Ok(SplitData {
            x_train: features.slice_move(s![..boundary, ..]),
            y_train: target.slice_move(s![..boundary]),
            x_test: features.slice_move(s![boundary.., ..]),
            y_test: target.slice_move(s![boundary..]),
            train_dates: &dates[..boundary],
            test_dates: &dates[boundary..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::align_horizon;
    use cadena_traits::{FeatureTable, Horizon};
    use ndarray::{Array1, Array2};

    fn table(n: usize) -> FeatureTable {
        let start = Date::from_ymd_opt(2021, 1, 1).unwrap();
        FeatureTable::new(
            (0..n).map(|i| start + chrono::Days::new(i as u64)).collect(),
            Array1::from_iter((0..n).map(|i| i as f64)),
            Array2::from_shape_fn((n, 1), |(i, _)| i as f64),
            vec!["x".to_string()],
            "y",
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_fraction() {
        assert!(ChronologicalSplit::new(0.8).is_ok());
        assert!(ChronologicalSplit::new(0.0).is_err());
        assert!(ChronologicalSplit::new(1.0).is_err());
        assert!(ChronologicalSplit::new(f64::NAN).is_err());
    }

    #[test]
    fn test_boundary_is_floor() {
        let split = ChronologicalSplit::default();
        assert_eq!(split.boundary(100), 80);
        assert_eq!(split.boundary(99), 79);
        assert_eq!(split.boundary(4), 3);
    }

    #[test]
    fn test_training_dates_precede_test_dates() {
        let t = table(99);
        let frame = align_horizon(&t, Horizon::new(5).unwrap()).unwrap();
        let data = ChronologicalSplit::default().split(&frame).unwrap();

        assert_eq!(data.x_train.nrows(), 75);
        assert_eq!(data.y_test.len(), 94 - 75);
        let last_train = data.train_dates.last().unwrap();
        assert!(data.test_dates.iter().all(|d| d > last_train));
        assert_eq!(data.y_train[0], 5.0);
    }

    #[test]
    fn test_split_too_small() {
        let t = table(3);
        let frame = align_horizon(&t, Horizon::new(2).unwrap()).unwrap();
        assert!(matches!(
            ChronologicalSplit::default().split(&frame),
            Err(CadenaError::InsufficientData(_))
        ));
    }
}
