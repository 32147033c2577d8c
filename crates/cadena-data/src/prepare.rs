//! Cleaning of the raw supplier price table.
//!
//! The raw table holds one row per trading day with supplier columns such as
//! `CON.DE_Open`, `CON.DE_Close` and `CON.DE_Return`. Cleaning sorts it by
//! date, makes sure the target return exists, and imputes gaps in the return
//! columns.

use crate::frame::{column_names, date_strings, float_values, is_return_column, sort_by_date};
use cadena_traits::{CadenaError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration for [`prepare`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Date column (default: "Date")
    pub date_column: String,
    /// Target return column (default: "vw_returns")
    pub target_column: String,
    /// Close price column used to derive the target when it is absent
    pub close_column: Option<String>,
    /// Case-insensitive substring marking return columns (default: "return")
    pub return_marker: String,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            target_column: "vw_returns".to_string(),
            close_column: None,
            return_marker: "return".to_string(),
        }
    }
}

/// Cleans a raw price table.
///
/// 1. Rows are stably sorted by date and dates are rewritten as `YYYY-MM-DD`.
/// 2. A missing target is derived from `close_column` as a percentage change;
///    without a configured close column this is a `MissingColumn` error.
/// 3. Return columns are coerced to floats, then forward- and back-filled.
/// 4. Rows whose target is still missing are dropped.
pub fn prepare(raw: &DataFrame, config: &PrepareConfig) -> Result<DataFrame> {
    let (sorted, dates) = sort_by_date(raw, &config.date_column)?;
    let names = column_names(&sorted);

    let mut columns: Vec<Column> = Vec::with_capacity(names.len() + 1);
    let mut target: Option<Vec<Option<f64>>> = None;
    let mut filled = 0usize;

    for name in &names {
        if *name == config.date_column {
            columns.push(date_strings(name, &dates));
            continue;
        }

        let is_return = is_return_column(name, &config.return_marker);
        if is_return || *name == config.target_column {
            let mut values = float_values(&sorted, name)?;
            if is_return {
                filled += fill_gaps(&mut values);
            }
            if *name == config.target_column {
                target = Some(values.clone());
            }
            columns.push(Column::new(name.as_str().into(), values));
        } else {
            columns.push(sorted.column(name)?.clone());
        }
    }

    let target = match target {
        Some(values) => values,
        None => {
            let close = config
                .close_column
                .as_deref()
                .ok_or_else(|| CadenaError::MissingColumn(config.target_column.clone()))?;
            let closes = float_values(&sorted, close)?;
            let mut values = pct_change(&closes);
            if is_return_column(&config.target_column, &config.return_marker) {
                filled += fill_gaps(&mut values);
            }
            info!(close, target = %config.target_column, "derived target from close prices");
            columns.push(Column::new(
                config.target_column.as_str().into(),
                values.clone(),
            ));
            values
        }
    };

    let keep: Vec<bool> = target.iter().map(Option::is_some).collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    let cleaned = DataFrame::new(columns)?;
    let cleaned = cleaned.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;

    if dropped > 0 {
        warn!(dropped, "dropped rows with missing target");
    }
    info!(
        rows = cleaned.height(),
        columns = cleaned.width(),
        filled,
        "prepared raw table"
    );
    Ok(cleaned)
}

/// Simple returns `x[i] / x[i - 1] - 1`; the first value is missing.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for (i, v) in values.iter().enumerate() {
        let change = match (prev, *v) {
            (Some(p), Some(c)) if i > 0 && p != 0.0 => Some(c / p - 1.0),
            _ => None,
        };
        out.push(change);
        // Missing prices carry the last observed price forward
        if v.is_some() {
            prev = *v;
        }
    }
    out
}

/// Forward-fills then back-fills missing values, returning how many were filled.
pub fn fill_gaps(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;

    let mut last = None;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None if last.is_some() => {
                *v = last;
                filled += 1;
            }
            None => {}
        }
    }

    let mut next = None;
    for v in values.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None if next.is_some() => {
                *v = next;
                filled += 1;
            }
            None => {}
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw() -> DataFrame {
        df! {
            "Date" => &["2020-01-03", "2020-01-01", "2020-01-02", "2020-01-06"],
            "CON.DE_Close" => &[Some(11.0), Some(10.0), None, Some(12.1)],
            "CON.DE_Return" => &[Some("0.1"), None, Some("bad"), Some("0.2")],
            "VOW3.DE_Close" => &[102.0, 100.0, 101.0, 110.0],
        }
        .unwrap()
    }

    #[test]
    fn test_fill_gaps() {
        let mut values = vec![None, Some(1.0), None, Some(3.0), None];
        assert_eq!(fill_gaps(&mut values), 3);
        assert_eq!(values, vec![Some(1.0), Some(1.0), Some(1.0), Some(3.0), Some(3.0)]);

        let mut empty: Vec<Option<f64>> = vec![None, None];
        assert_eq!(fill_gaps(&mut empty), 0);
    }

    #[test]
    fn test_pct_change() {
        let out = pct_change(&[Some(100.0), Some(110.0), None, Some(121.0)]);
        assert_eq!(out[0], None);
        assert_relative_eq!(out[1].unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(out[2], None);
        assert_relative_eq!(out[3].unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_target_without_close_is_error() {
        let err = prepare(&raw(), &PrepareConfig::default()).unwrap_err();
        assert!(matches!(err, CadenaError::MissingColumn(c) if c == "vw_returns"));
    }

    #[test]
    fn test_prepare_derives_target_and_fills_returns() {
        let config = PrepareConfig {
            close_column: Some("VOW3.DE_Close".to_string()),
            ..Default::default()
        };
        let clean = prepare(&raw(), &config).unwrap();

        // Derived target is a return column, so its leading gap is back-filled
        assert_eq!(clean.height(), 4);
        let target = float_values(&clean, "vw_returns").unwrap();
        assert_relative_eq!(target[0].unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(target[1].unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(target[2].unwrap(), 102.0 / 101.0 - 1.0, epsilon = 1e-12);

        // Sorted order: 01 (missing), 02 (bad), 03 (0.1), 06 (0.2)
        let supplier = float_values(&clean, "CON.DE_Return").unwrap();
        assert_eq!(supplier, vec![Some(0.1), Some(0.1), Some(0.1), Some(0.2)]);

        // Non-return columns are only reordered
        let close = float_values(&clean, "CON.DE_Close").unwrap();
        assert_eq!(close, vec![Some(10.0), None, Some(11.0), Some(12.1)]);
    }

    #[test]
    fn test_prepare_drops_rows_without_target() {
        let raw = df! {
            "Date" => &["2020-01-01", "2020-01-02", "2020-01-03"],
            "target" => &[Some(0.1), None, Some(0.3)],
            "x" => &[1.0, 2.0, 3.0],
        }
        .unwrap();
        let config = PrepareConfig {
            target_column: "target".to_string(),
            ..Default::default()
        };
        let clean = prepare(&raw, &config).unwrap();
        assert_eq!(clean.height(), 2);
        assert_eq!(
            float_values(&clean, "x").unwrap(),
            vec![Some(1.0), Some(3.0)]
        );
    }
}
