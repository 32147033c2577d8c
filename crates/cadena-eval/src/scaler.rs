//! Column standardization fitted on a training partition.

use cadena_traits::stats::{ColumnStats, MIN_STD_THRESHOLD, column_stats};
use cadena_traits::{CadenaError, Result};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Per-column mean and population standard deviation.
///
/// Columns with zero variance in the training partition are centered but
/// not divided; [`FittedScaler::scaled`] records which columns were divided.
/// Serialized as three parallel arrays `means`, `stds` and `scaled`, which
/// are checked for consistency on load.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedScaler {
    columns: Vec<ColumnStats>,
}

#[derive(Serialize, Deserialize)]
struct ScalerFile {
    means: Vec<f64>,
    stds: Vec<f64>,
    scaled: Vec<bool>,
}

impl Serialize for FittedScaler {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ScalerFile {
            means: self.means(),
            stds: self.stds(),
            scaled: self.scaled(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FittedScaler {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let file = ScalerFile::deserialize(deserializer)?;
        Self::from_file(file).map_err(de::Error::custom)
    }
}

impl FittedScaler {
    /// Computes column statistics from `train`.
    pub fn fit(train: ArrayView2<'_, f64>) -> Result<Self> {
        if train.nrows() == 0 {
            return Err(CadenaError::InsufficientData(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        let columns = train
            .axis_iter(Axis(1))
            .map(|column| {
                column_stats(column)
                    .ok_or_else(|| CadenaError::InsufficientData("empty column".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Parses a scaler from JSON, rejecting inconsistent columns.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_file(serde_json::from_str(json)?)
    }

    /// Serializes the scaler to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn from_file(file: ScalerFile) -> Result<Self> {
        let n = file.means.len();
        for len in [file.stds.len(), file.scaled.len()] {
            if len != n {
                return Err(CadenaError::InvalidData(format!(
                    "scaler has {n} means but {len} entries in another field"
                )));
            }
        }

        let columns = file
            .means
            .into_iter()
            .zip(file.stds)
            .zip(file.scaled)
            .enumerate()
            .map(|(j, ((mean, std), applied))| {
                let usable = mean.is_finite() && std.is_finite() && std >= 0.0;
                if !usable || (applied && std <= MIN_STD_THRESHOLD) {
                    return Err(CadenaError::InvalidData(format!(
                        "scaler column {j} has mean {mean} and std {std}"
                    )));
                }
                Ok(ColumnStats { mean, std, applied })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Standardizes `x` with the fitted statistics.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.columns.len() {
            return Err(CadenaError::DimensionMismatch {
                expected: self.columns.len(),
                got: x.ncols(),
            });
        }

        let mut out = x.to_owned();
        for (stats, mut column) in self.columns.iter().zip(out.axis_iter_mut(Axis(1))) {
            let (mean, divisor) = (stats.mean, stats.divisor());
            column.mapv_inplace(|v| (v - mean) / divisor);
        }
        Ok(out)
    }

    /// Number of columns the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Fitted statistics, one entry per column.
    pub fn columns(&self) -> &[ColumnStats] {
        &self.columns
    }

    /// Column means.
    pub fn means(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.mean).collect()
    }

    /// Column population standard deviations.
    pub fn stds(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.std).collect()
    }

    /// Whether each column was divided by its standard deviation.
    pub fn scaled(&self) -> Vec<bool> {
        self.columns.iter().map(|c| c.applied).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_fit_transform_standardizes() {
        let x = array![[1.0, 10.0, 3.0], [2.0, 20.0, 3.0], [3.0, 60.0, 3.0], [6.0, 10.0, 3.0]];
        let scaler = FittedScaler::fit(x.view()).unwrap();
        let z = scaler.transform(x.view()).unwrap();

        for j in 0..2 {
            let col = z.column(j);
            let mean = col.mean().unwrap();
            let std = col.std(0.0);
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(std, 1.0, epsilon = 1e-12);
        }
        // Constant column is centered only
        assert_eq!(scaler.scaled(), [true, true, false]);
        assert_eq!(scaler.columns()[2].divisor(), 1.0);
        assert!(z.column(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = array![[0.0], [2.0]];
        let scaler = FittedScaler::fit(train.view()).unwrap();
        let test = array![[4.0]];
        let z = scaler.transform(test.view()).unwrap();
        assert_abs_diff_eq!(z[[0, 0]], 3.0);
    }

    #[test]
    fn test_errors() {
        let empty = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            FittedScaler::fit(empty.view()),
            Err(CadenaError::InsufficientData(_))
        ));

        let scaler = FittedScaler::fit(array![[1.0, 2.0], [3.0, 4.0]].view()).unwrap();
        assert!(matches!(
            scaler.transform(array![[1.0]].view()),
            Err(CadenaError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let scaler = FittedScaler::fit(array![[1.0, 2.0], [3.0, 5.0]].view()).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        assert!(json.contains("\"means\""));
        let back: FittedScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_features(), 2);
        assert_eq!(back.scaled(), scaler.scaled());
    }

    #[test]
    fn test_load_rejects_inconsistent_columns() {
        let cases = [
            r#"{"means": [0.0, 0.0], "stds": [1.0], "scaled": [true]}"#,
            r#"{"means": [0.0], "stds": [1.0], "scaled": [true, false]}"#,
            r#"{"means": [0.0], "stds": [0.0], "scaled": [true]}"#,
            r#"{"means": [0.0], "stds": [-1.0], "scaled": [false]}"#,
        ];
        for json in cases {
            assert!(
                matches!(FittedScaler::from_json(json), Err(CadenaError::InvalidData(_))),
                "{json}"
            );
            assert!(serde_json::from_str::<FittedScaler>(json).is_err(), "{json}");
        }
        let ok: FittedScaler =
            serde_json::from_str(r#"{"means": [1.0], "stds": [0.0], "scaled": [false]}"#).unwrap();
        assert_eq!(ok.transform(array![[3.0]].view()).unwrap()[[0, 0]], 2.0);
    }
}
