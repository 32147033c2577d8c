//! Common types used throughout the cadena workspace.
//!
//! This module defines the feature table consumed by the evaluation harness,
//! the forecast horizon type, and the schema that names the date and target
//! columns of a feature file.

use crate::{CadenaError, Result};
use ndarray::{Array1, Array2, s};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// Horizons evaluated when the caller does not configure any.
pub const DEFAULT_HORIZONS: [usize; 3] = [1, 5, 20];

/// Parse a date string in `YYYY-MM-DD` format.
///
/// A trailing time part (`2017-06-01 00:00:00` or `2017-06-01T00:00:00`) is
/// ignored, which is how most dataframe libraries serialize daily timestamps.
pub fn parse_date(value: &str) -> Result<Date> {
    let trimmed = value.trim();
    let day_part = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse_from_str(day_part, "%Y-%m-%d")
        .map_err(|e| CadenaError::InvalidDate(format!("'{value}': {e}")))
}

/// Forecast horizon in trading rows.
///
/// The target is shifted `days` rows into the future before training, so a
/// horizon of 5 asks the model to predict the return five rows ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Horizon(usize);

impl Horizon {
    /// Create a horizon, rejecting zero.
    pub fn new(days: usize) -> Result<Self> {
        if days == 0 {
            return Err(CadenaError::InvalidParameter(
                "forecast horizon must be a positive number of rows".to_string(),
            ));
        }
        Ok(Self(days))
    }

    /// Number of rows the target is shifted by.
    #[must_use]
    pub const fn days(self) -> usize {
        self.0
    }

    /// The default horizon set `{1, 5, 20}`.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_HORIZONS.iter().map(|&d| Self(d)).collect()
    }
}

impl TryFrom<usize> for Horizon {
    type Error = CadenaError;

    fn try_from(days: usize) -> Result<Self> {
        Self::new(days)
    }
}

impl From<Horizon> for usize {
    fn from(h: Horizon) -> Self {
        h.0
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names of the special columns in a feature file.
///
/// Every column other than these two is treated as a numeric predictor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    /// Calendar date column
    pub date_column: String,
    /// Target return column
    pub target_column: String,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            target_column: "vw_returns".to_string(),
        }
    }
}

/// A cleaned, date-sorted table of one target column and many predictors.
///
/// Rows are aligned across `dates`, `target` and `features`. Construction
/// validates the invariants the harness relies on: no missing or non-finite
/// values and non-decreasing dates.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    dates: Vec<Date>,
    target: Array1<f64>,
    features: Array2<f64>,
    feature_names: Vec<String>,
    target_name: String,
}

impl FeatureTable {
    /// Creates a feature table from already extracted columns.
    pub fn new(
        dates: Vec<Date>,
        target: Array1<f64>,
        features: Array2<f64>,
        feature_names: Vec<String>,
        target_name: impl Into<String>,
    ) -> Result<Self> {
        let n = dates.len();
        if target.len() != n {
            return Err(CadenaError::DimensionMismatch {
                expected: n,
                got: target.len(),
            });
        }
        if features.nrows() != n {
            return Err(CadenaError::DimensionMismatch {
                expected: n,
                got: features.nrows(),
            });
        }
        if feature_names.len() != features.ncols() {
            return Err(CadenaError::DimensionMismatch {
                expected: features.ncols(),
                got: feature_names.len(),
            });
        }
        if let Some(i) = dates.windows(2).position(|w| w[1] < w[0]) {
            return Err(CadenaError::InvalidData(format!(
                "dates are not sorted: {} follows {}",
                dates[i + 1],
                dates[i]
            )));
        }
        if target.iter().any(|v| !v.is_finite()) {
            return Err(CadenaError::InvalidData(
                "target contains missing or non-finite values".to_string(),
            ));
        }
        for (j, column) in features.columns().into_iter().enumerate() {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(CadenaError::InvalidData(format!(
                    "predictor '{}' contains missing or non-finite values",
                    feature_names[j]
                )));
            }
        }

        Ok(Self {
            dates,
            target,
            features,
            feature_names,
            target_name: target_name.into(),
        })
    }

    /// Builds a feature table from a DataFrame using an explicit schema.
    ///
    /// Rows are stably sorted by date. The target column must exist; the date
    /// column must hold `YYYY-MM-DD` strings; every other column must be
    /// numeric and complete.
    pub fn from_frame(df: &DataFrame, schema: &TableSchema) -> Result<Self> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for required in [&schema.date_column, &schema.target_column] {
            if !names.iter().any(|n| n == required) {
                return Err(CadenaError::MissingColumn(required.clone()));
            }
        }

        let raw_dates = date_column(df, &schema.date_column)?;
        let raw_target = numeric_column(df, &schema.target_column)?;

        let feature_names: Vec<String> = names
            .iter()
            .filter(|n| **n != schema.date_column && **n != schema.target_column)
            .cloned()
            .collect();
        let raw_features = feature_names
            .iter()
            .map(|name| numeric_column(df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..raw_dates.len()).collect();
        order.sort_by_key(|&i| raw_dates[i]);

        let dates: Vec<Date> = order.iter().map(|&i| raw_dates[i]).collect();
        let target: Array1<f64> = order.iter().map(|&i| raw_target[i]).collect();
        let features = Array2::from_shape_fn((order.len(), feature_names.len()), |(r, c)| {
            raw_features[c][order[r]]
        });

        Self::new(
            dates,
            target,
            features,
            feature_names,
            schema.target_column.clone(),
        )
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Returns whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Returns the number of predictor columns.
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Row dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Target values.
    pub const fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Predictor matrix (rows × predictors).
    pub const fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Predictor column names, in matrix column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Name of the target column.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Number of rows dated strictly before `date`.
    pub fn rows_before(&self, date: Date) -> usize {
        self.dates.partition_point(|d| *d < date)
    }

    /// Row range whose dates fall within `[start, end]`.
    pub fn date_range(&self, start: Date, end: Date) -> Range<usize> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        lo..hi.max(lo)
    }

    /// Copies a contiguous range of rows into a new table.
    pub fn slice_rows(&self, rows: Range<usize>) -> Result<Self> {
        if rows.end > self.len() || rows.start > rows.end {
            return Err(CadenaError::InvalidParameter(format!(
                "row range {}..{} is outside a table of {} rows",
                rows.start,
                rows.end,
                self.len()
            )));
        }
        Ok(Self {
            dates: self.dates[rows.clone()].to_vec(),
            target: self.target.slice(s![rows.clone()]).to_owned(),
            features: self.features.slice(s![rows, ..]).to_owned(),
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
        })
    }
}

fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Date>> {
    let series = df.column(name)?.as_materialized_series();
    let values = series.str().map_err(|_| {
        CadenaError::InvalidData(format!(
            "date column '{name}' must contain YYYY-MM-DD strings, found {}",
            series.dtype()
        ))
    })?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(s) => parse_date(s),
            None => Err(CadenaError::InvalidData(format!(
                "date column '{name}' is missing a value at row {row}"
            ))),
        })
        .collect()
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.as_materialized_series();
    if matches!(series.dtype(), DataType::String) {
        return Err(CadenaError::InvalidData(format!(
            "column '{name}' is not numeric"
        )));
    }

    let cast = series.cast(&DataType::Float64)?;
    let values = cast.f64()?;
    if values.null_count() > 0 {
        return Err(CadenaError::InvalidData(format!(
            "column '{name}' has {} missing values",
            values.null_count()
        )));
    }

    Ok(values.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn frame() -> DataFrame {
        df! {
            "Date" => &["2020-01-03", "2020-01-01", "2020-01-02"],
            "vw_returns" => &[0.03, 0.01, 0.02],
            "CON.DE_Return_lag1" => &[3.0, 1.0, 2.0],
            "bond_yeld" => &[30i64, 10, 20],
        }
        .unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_date("2024-01-15 00:00:00").unwrap(), date(2024, 1, 15));
        assert!(parse_date("15/01/2024").is_err());
    }

    #[test]
    fn test_horizon_rejects_zero() {
        assert!(Horizon::new(0).is_err());
        assert_eq!(Horizon::new(5).unwrap().days(), 5);
        assert_eq!(Horizon::new(20).unwrap().to_string(), "20");
    }

    #[test]
    fn test_horizon_defaults() {
        let days: Vec<usize> = Horizon::defaults().into_iter().map(usize::from).collect();
        assert_eq!(days, vec![1, 5, 20]);
    }

    #[test]
    fn test_horizon_deserialize() {
        let h: Horizon = serde_json::from_str("5").unwrap();
        assert_eq!(h.days(), 5);
        assert!(serde_json::from_str::<Horizon>("0").is_err());
    }

    #[test]
    fn test_from_frame_sorts_and_aligns() {
        let table = FeatureTable::from_frame(&frame(), &TableSchema::default()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.n_features(), 2);
        assert_eq!(table.dates()[0], date(2020, 1, 1));
        assert_eq!(table.target().to_vec(), vec![0.01, 0.02, 0.03]);
        assert_eq!(table.features()[[0, 0]], 1.0);
        assert_eq!(table.features()[[2, 1]], 30.0);
        assert_eq!(table.feature_names(), &["CON.DE_Return_lag1", "bond_yeld"]);
        assert_eq!(table.target_name(), "vw_returns");
    }

    #[test]
    fn test_from_frame_missing_target() {
        let schema = TableSchema {
            target_column: "target".to_string(),
            ..Default::default()
        };
        let err = FeatureTable::from_frame(&frame(), &schema).unwrap_err();
        assert!(matches!(err, CadenaError::MissingColumn(c) if c == "target"));
    }

    #[test]
    fn test_from_frame_rejects_nulls() {
        let df = df! {
            "Date" => &["2020-01-01", "2020-01-02"],
            "vw_returns" => &[Some(0.01), None],
        }
        .unwrap();
        let err = FeatureTable::from_frame(&df, &TableSchema::default()).unwrap_err();
        assert!(matches!(err, CadenaError::InvalidData(_)));
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = FeatureTable::new(
            vec![date(2020, 1, 1)],
            Array1::from_vec(vec![0.1, 0.2]),
            Array2::zeros((1, 0)),
            vec![],
            "y",
        )
        .unwrap_err();
        assert!(matches!(err, CadenaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_date_range_and_rows_before() {
        let table = FeatureTable::from_frame(&frame(), &TableSchema::default()).unwrap();

        assert_eq!(table.rows_before(date(2020, 1, 2)), 1);
        assert_eq!(table.date_range(date(2020, 1, 2), date(2020, 1, 31)), 1..3);
        assert_eq!(table.date_range(date(2021, 1, 1), date(2021, 1, 31)).len(), 0);

        let tail = table.slice_rows(1..3).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.dates()[0], date(2020, 1, 2));
        assert!(table.slice_rows(2..5).is_err());
    }
}
