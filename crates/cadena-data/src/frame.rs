//! Column helpers shared by cleaning and feature engineering.

use cadena_traits::types::parse_date;
use cadena_traits::{CadenaError, Date, Result};
use polars::prelude::*;

/// Column names in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Fails with `MissingColumn` unless `name` is a column of `df`.
pub fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        Ok(())
    } else {
        Err(CadenaError::MissingColumn(name.to_string()))
    }
}

/// Returns `df` with rows stably sorted by its date column, plus the sorted dates.
///
/// Every date must be present and parse as `YYYY-MM-DD`.
pub fn sort_by_date(df: &DataFrame, date_column: &str) -> Result<(DataFrame, Vec<Date>)> {
    require_column(df, date_column)?;
    let series = df.column(date_column)?.as_materialized_series();
    let text = series.str().map_err(|_| {
        CadenaError::InvalidData(format!(
            "date column '{date_column}' must contain date strings, found {}",
            series.dtype()
        ))
    })?;

    let dates = text
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map_or_else(
                || {
                    Err(CadenaError::InvalidData(format!(
                        "date column '{date_column}' is missing a value at row {row}"
                    )))
                },
                parse_date,
            )
        })
        .collect::<Result<Vec<Date>>>()?;

    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&i| dates[i]);

    let indices = order
        .iter()
        .map(|&i| {
            IdxSize::try_from(i)
                .map_err(|_| CadenaError::InvalidData(format!("row index {i} out of range")))
        })
        .collect::<Result<Vec<IdxSize>>>()?;
    let sorted = df.take(&IdxCa::from_vec("order".into(), indices))?;
    let sorted_dates = order.into_iter().map(|i| dates[i]).collect();

    Ok((sorted, sorted_dates))
}

/// Date column rendered as `YYYY-MM-DD` strings.
pub fn date_strings(name: &str, dates: &[Date]) -> Column {
    let values: Vec<String> = dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    Column::new(name.into(), values)
}

/// Reads a column as optional floats.
///
/// Text cells that do not parse as numbers and non-finite values become
/// missing.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    require_column(df, name)?;
    let series = df.column(name)?.as_materialized_series();

    let values: Vec<Option<f64>> = if matches!(series.dtype(), DataType::String) {
        series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect()
    } else {
        let cast = series.cast(&DataType::Float64)?;
        cast.f64()?.into_iter().collect()
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Whether a column name marks a return series, ignoring case.
pub fn is_return_column(name: &str, marker: &str) -> bool {
    name.to_lowercase().contains(&marker.to_lowercase())
}
