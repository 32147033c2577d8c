//! Training a model for a single out-of-sample month.

use crate::backtest::month_window;
use crate::scaler::FittedScaler;
use cadena_models::{ModelFamily, ModelParams, TrainedModel};
use cadena_traits::{CadenaError, Date, FeatureTable, Result};
use ndarray::s;
use tracing::info;

/// First day of the month containing `date`.
pub fn month_start(date: Date) -> Result<Date> {
    Ok(month_window(date)?.0)
}

/// Parses `YYYY-MM` or `YYYY-MM-DD` into the first day of that month.
pub fn parse_month(value: &str) -> Result<Date> {
    let trimmed = value.trim();
    let full = if trimmed.len() == 7 {
        format!("{trimmed}-01")
    } else {
        trimmed.to_string()
    };
    let date = cadena_traits::parse_date(&full)?;
    month_start(date)
}

/// A model fitted on every row before its test month, with its scaler.
#[derive(Debug, Clone)]
pub struct MonthlyModel {
    /// Model family
    pub family: ModelFamily,
    /// First day of the out-of-sample month
    pub test_month: Date,
    /// Fitted model
    pub model: TrainedModel,
    /// Scaler fitted on the training rows
    pub scaler: FittedScaler,
    /// Rows used for training
    pub train_rows: usize,
    /// Rows inside the test month
    pub test_rows: usize,
}

/// Fits `family` on all rows dated before the month containing `month`.
///
/// Needs at least one training row and one row inside the month, so that
/// the persisted model can later be backtested.
pub fn train_for_month(
    table: &FeatureTable,
    family: ModelFamily,
    params: &ModelParams,
    seed: u64,
    month: Date,
) -> Result<MonthlyModel> {
    let (start, end) = month_window(month)?;
    let train_rows = table.rows_before(start);
    if train_rows == 0 {
        return Err(CadenaError::InsufficientData(format!(
            "no rows before {start} to train on"
        )));
    }
    let test_rows = table.date_range(start, end).len();
    if test_rows == 0 {
        return Err(CadenaError::InsufficientData(format!(
            "no rows between {start} and {end} to test on"
        )));
    }

    let x_train = table.features().slice(s![..train_rows, ..]);
    let y_train = table.target().slice(s![..train_rows]);
    let scaler = FittedScaler::fit(x_train)?;
    let x_scaled = scaler.transform(x_train)?;
    let model = family.train(x_scaled.view(), y_train, params, seed)?;

    info!(
        model = family.key(),
        month = %start,
        train_rows,
        test_rows,
        "trained monthly model"
    );

    Ok(MonthlyModel {
        family,
        test_month: start,
        model,
        scaler,
        train_rows,
        test_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadena_traits::Regressor;
    use ndarray::{Array1, Array2};

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> FeatureTable {
        let start = date(2017, 4, 1);
        let n = 120;
        FeatureTable::new(
            (0..n).map(|i| start + chrono::Days::new(i as u64)).collect(),
            Array1::from_iter((0..n).map(|i| (i as f64 * 0.3).cos() * 0.01)),
            Array2::from_shape_fn((n, 3), |(i, j)| ((i + j) as f64 * 0.1).sin()),
            vec!["a".into(), "b".into(), "c".into()],
            "vw_returns",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2017-06").unwrap(), date(2017, 6, 1));
        assert_eq!(parse_month("2017-06-17").unwrap(), date(2017, 6, 1));
        assert!(parse_month("June").is_err());
    }

    #[test]
    fn test_train_uses_rows_before_month() {
        let t = table();
        let m = train_for_month(
            &t,
            ModelFamily::ElasticNet,
            &ModelParams::default(),
            42,
            date(2017, 6, 12),
        )
        .unwrap();

        assert_eq!(m.test_month, date(2017, 6, 1));
        // April (30) + May (31)
        assert_eq!(m.train_rows, 61);
        assert_eq!(m.test_rows, 30);
        assert_eq!(m.model.n_features(), 3);
        assert_eq!(m.scaler.n_features(), 3);
    }

    #[test]
    fn test_month_without_history_or_rows() {
        let t = table();
        let params = ModelParams::default();
        assert!(matches!(
            train_for_month(&t, ModelFamily::ElasticNet, &params, 42, date(2017, 4, 1)),
            Err(CadenaError::InsufficientData(_))
        ));
        assert!(matches!(
            train_for_month(&t, ModelFamily::ElasticNet, &params, 42, date(2018, 1, 1)),
            Err(CadenaError::InsufficientData(_))
        ));
    }
}
