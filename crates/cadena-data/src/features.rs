//! Lagged and rolling features built from supplier return columns.
//!
//! Every feature at row `t` only uses values from rows before `t`, so the
//! table can be fed to the harness without look-ahead.

use crate::frame::{
    column_names, date_strings, float_values, is_return_column, require_column, sort_by_date,
};
use cadena_traits::stats::{mean, sample_std};
use cadena_traits::{CadenaError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for [`make_features`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Date column (default: "Date")
    pub date_column: String,
    /// Target return column, copied through unchanged (default: "vw_returns")
    pub target_column: String,
    /// Case-insensitive substring marking return columns (default: "return")
    pub return_marker: String,
    /// Number of lags per return column (default: 5)
    pub lags: usize,
    /// Trailing windows for rolling mean and standard deviation (default: [3])
    pub rolling_windows: Vec<usize>,
    /// Exogenous columns added as-is with a one-row lag (default: ["bond_yeld"])
    pub exogenous: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            target_column: "vw_returns".to_string(),
            return_marker: "return".to_string(),
            lags: 5,
            rolling_windows: vec![3],
            exogenous: vec!["bond_yeld".to_string()],
        }
    }
}

impl FeatureConfig {
    /// Checks the window sizes.
    pub fn validate(&self) -> Result<()> {
        if let Some(w) = self.rolling_windows.iter().find(|w| **w < 2) {
            return Err(CadenaError::InvalidParameter(format!(
                "rolling windows need at least 2 rows for a standard deviation, got {w}"
            )));
        }
        Ok(())
    }
}

/// Builds the feature table from a cleaned table.
///
/// Output columns are the date, the target, then for each return column
/// other than the target: `<col>_lag<k>` for `k = 1..=lags`,
/// `<col>_rmean_<w>` and `<col>_rstd_<w>` for each window. Exogenous
/// columns that exist are appended with their `<col>_lag1`. Rows with any
/// missing value are dropped.
pub fn make_features(clean: &DataFrame, config: &FeatureConfig) -> Result<DataFrame> {
    config.validate()?;
    let (sorted, dates) = sort_by_date(clean, &config.date_column)?;
    require_column(&sorted, &config.target_column)?;

    let names = column_names(&sorted);
    let sources: Vec<&String> = names
        .iter()
        .filter(|n| {
            **n != config.date_column
                && **n != config.target_column
                && is_return_column(n, &config.return_marker)
        })
        .collect();

    let mut generated: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for name in &sources {
        let values = float_values(&sorted, name)?;
        for k in 1..=config.lags {
            generated.push((format!("{name}_lag{k}"), lag(&values, k)));
        }
        for &w in &config.rolling_windows {
            generated.push((format!("{name}_rmean_{w}"), rolling_past(&values, w, mean)));
            generated.push((format!("{name}_rstd_{w}"), rolling_past(&values, w, sample_std)));
        }
    }

    for name in &config.exogenous {
        if !names.contains(name) {
            continue;
        }
        let values = float_values(&sorted, name)?;
        let lagged = lag(&values, 1);
        generated.push((name.clone(), values));
        generated.push((format!("{name}_lag1"), lagged));
    }

    let target = float_values(&sorted, &config.target_column)?;
    let keep: Vec<bool> = (0..sorted.height())
        .map(|row| target[row].is_some() && generated.iter().all(|(_, v)| v[row].is_some()))
        .collect();

    let mut columns = Vec::with_capacity(generated.len() + 2);
    columns.push(date_strings(&config.date_column, &dates));
    columns.push(Column::new(config.target_column.as_str().into(), target));
    for (name, values) in generated {
        columns.push(Column::new(name.as_str().into(), values));
    }

    let table = DataFrame::new(columns)?
        .filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
    if table.height() == 0 {
        return Err(CadenaError::InsufficientData(format!(
            "no complete rows remain after building features from {} rows",
            sorted.height()
        )));
    }

    info!(
        sources = sources.len(),
        features = table.width() - 2,
        rows = table.height(),
        dropped = sorted.height() - table.height(),
        "built feature table"
    );
    Ok(table)
}

/// Value from `k` rows earlier; the first `k` rows are missing.
pub fn lag(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| if i >= k { values[i - k] } else { None })
        .collect()
}

/// Statistic over the `window` rows strictly before each row.
///
/// Missing when fewer than `window` earlier rows exist or any of them is
/// missing.
pub fn rolling_past(
    values: &[Option<f64>],
    window: usize,
    stat: fn(&[f64]) -> Option<f64>,
) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            let past: Option<Vec<f64>> = values[i - window..i].iter().copied().collect();
            past.and_then(|p| stat(&p))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clean() -> DataFrame {
        let dates: Vec<String> = (1..=10).map(|d| format!("2020-02-{d:02}")).collect();
        let supplier: Vec<f64> = (1..=10).map(f64::from).collect();
        let target: Vec<f64> = (1..=10).map(|i| f64::from(i) / 100.0).collect();
        let bond: Vec<f64> = (1..=10).map(|i| 2.0 + f64::from(i) / 10.0).collect();
        df! {
            "Date" => dates,
            "vw_returns" => target,
            "CON.DE_Return" => supplier,
            "CON.DE_Close" => vec![1.0; 10],
            "bond_yeld" => bond,
        }
        .unwrap()
    }

    #[test]
    fn test_lag() {
        let v = vec![Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(lag(&v, 1), vec![None, Some(1.0), Some(2.0)]);
        assert_eq!(lag(&v, 3), vec![None, None, None]);
    }

    #[test]
    fn test_rolling_past_uses_only_earlier_rows() {
        let v = vec![Some(1.0), Some(2.0), Some(3.0), Some(10.0)];
        let means = rolling_past(&v, 3, mean);
        assert_eq!(means[..3], [None, None, None]);
        assert_relative_eq!(means[3].unwrap(), 2.0);

        let stds = rolling_past(&v, 2, sample_std);
        assert_relative_eq!(stds[2].unwrap(), 0.5_f64.sqrt());

        let gappy = vec![Some(1.0), None, Some(3.0), Some(4.0)];
        assert_eq!(rolling_past(&gappy, 2, mean)[2], None);
    }

    #[test]
    fn test_make_features_columns_and_rows() {
        let table = make_features(&clean(), &FeatureConfig::default()).unwrap();
        let names = column_names(&table);

        assert_eq!(
            names,
            vec![
                "Date",
                "vw_returns",
                "CON.DE_Return_lag1",
                "CON.DE_Return_lag2",
                "CON.DE_Return_lag3",
                "CON.DE_Return_lag4",
                "CON.DE_Return_lag5",
                "CON.DE_Return_rmean_3",
                "CON.DE_Return_rstd_3",
                "bond_yeld",
                "bond_yeld_lag1",
            ]
        );
        // Five lags drop the first five rows
        assert_eq!(table.height(), 5);

        let lag1 = float_values(&table, "CON.DE_Return_lag1").unwrap();
        assert_eq!(lag1[0], Some(5.0));
        let rmean = float_values(&table, "CON.DE_Return_rmean_3").unwrap();
        assert_relative_eq!(rmean[0].unwrap(), 4.0);
        let rstd = float_values(&table, "CON.DE_Return_rstd_3").unwrap();
        assert_relative_eq!(rstd[0].unwrap(), 1.0);
    }

    #[test]
    fn test_make_features_rejects_tiny_window() {
        let config = FeatureConfig {
            rolling_windows: vec![1],
            ..Default::default()
        };
        assert!(matches!(
            make_features(&clean(), &config),
            Err(CadenaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_make_features_too_many_lags() {
        let config = FeatureConfig {
            lags: 20,
            ..Default::default()
        };
        assert!(matches!(
            make_features(&clean(), &config),
            Err(CadenaError::InsufficientData(_))
        ));
    }
}
