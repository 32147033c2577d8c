//! Long/flat/short threshold backtest of monthly model predictions.
//!
//! A day is long when the predicted return exceeds the threshold, short when
//! it is below the negative threshold, and flat otherwise. P&L is the position
//! times the realized return, compounded into a cumulative curve. No
//! transaction costs are charged.

use crate::artifact::{load_model, load_scaler, test_month_from_path};
use cadena_traits::{CadenaError, Date, FeatureTable, Regressor, Result};
use chrono::{Datelike, Months};
use ndarray::{ArrayView1, s};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Trading days used to annualize the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// First and last calendar day of the month containing `date`.
pub fn month_window(date: Date) -> Result<(Date, Date)> {
    let start = date
        .with_day(1)
        .ok_or_else(|| CadenaError::InvalidDate(format!("no first day for {date}")))?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| CadenaError::InvalidDate(format!("month of {date} has no end")))?;
    Ok((start, end))
}

/// One backtested day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    /// Trading date
    pub date: Date,
    /// Predicted return
    pub pred: f64,
    /// Position: 1 long, -1 short, 0 flat
    pub pos: i8,
    /// Realized return
    pub real: f64,
    /// Position times realized return
    pub pnl: f64,
    /// Compounded P&L up to and including this day
    pub cum_pnl: f64,
}

/// Aggregate statistics of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Number of days
    pub days: usize,
    /// Final cumulative P&L
    pub total_return: f64,
    /// Annualized Sharpe ratio of daily P&L, if defined
    pub sharpe: Option<f64>,
    /// Maximum drawdown of the cumulative curve
    pub max_drawdown: f64,
    /// Share of non-flat days with positive P&L, if any were traded
    pub hit_rate: Option<f64>,
    /// Days held long
    pub long_days: usize,
    /// Days held short
    pub short_days: usize,
    /// Days held flat
    pub flat_days: usize,
}

/// Result of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Daily rows in date order
    pub rows: Vec<BacktestRow>,
    /// Summary statistics
    pub summary: BacktestSummary,
}

impl BacktestResult {
    /// Annualized Sharpe ratio; `None` with fewer than two returns or zero volatility.
    pub fn calculate_sharpe(returns: &[f64], trading_days_per_year: usize) -> Option<f64> {
        let valid_returns: Vec<f64> = returns.iter().copied().filter(|x| x.is_finite()).collect();

        if valid_returns.len() < 2 {
            return None;
        }

        let mean = valid_returns.iter().sum::<f64>() / valid_returns.len() as f64;
        let variance = valid_returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (valid_returns.len() - 1) as f64;
        let std = variance.sqrt();

        if std == 0.0 {
            None
        } else {
            Some(mean / std * (trading_days_per_year as f64).sqrt())
        }
    }

    /// Calculate maximum drawdown of a cumulative return curve.
    pub fn calculate_max_drawdown(cumulative_returns: &[f64]) -> f64 {
        let mut max_dd = 0.0;
        let mut peak = 0.0;

        for &cum_ret in cumulative_returns {
            if cum_ret > peak {
                peak = cum_ret;
            }
            let dd = (peak - cum_ret) / (1.0 + peak);
            if dd > max_dd {
                max_dd = dd;
            }
        }

        max_dd
    }

    /// Rows as a frame with columns `Date, pred, pos, real, pnl, cum_pnl`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.date.format("%Y-%m-%d").to_string())
            .collect();
        let pred: Vec<f64> = self.rows.iter().map(|r| r.pred).collect();
        let pos: Vec<i32> = self.rows.iter().map(|r| i32::from(r.pos)).collect();
        let real: Vec<f64> = self.rows.iter().map(|r| r.real).collect();
        let pnl: Vec<f64> = self.rows.iter().map(|r| r.pnl).collect();
        let cum_pnl: Vec<f64> = self.rows.iter().map(|r| r.cum_pnl).collect();

        Ok(DataFrame::new(vec![
            Column::new("Date".into(), dates),
            Column::new("pred".into(), pred),
            Column::new("pos".into(), pos),
            Column::new("real".into(), real),
            Column::new("pnl".into(), pnl),
            Column::new("cum_pnl".into(), cum_pnl),
        ])?)
    }
}

/// Threshold trading rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdBacktest {
    threshold: f64,
}

impl ThresholdBacktest {
    /// Creates the rule; the threshold must be finite and non-negative.
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(CadenaError::InvalidParameter(format!(
                "threshold must be a non-negative number, got {threshold}"
            )));
        }
        Ok(Self { threshold })
    }

    /// The threshold.
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Position implied by a predicted return.
    pub fn position(&self, prediction: f64) -> i8 {
        if prediction > self.threshold {
            1
        } else if prediction < -self.threshold {
            -1
        } else {
            0
        }
    }

    /// Trades `predictions` against `realized` returns day by day.
    pub fn run(
        &self,
        dates: &[Date],
        predictions: ArrayView1<'_, f64>,
        realized: ArrayView1<'_, f64>,
    ) -> Result<BacktestResult> {
        if dates.is_empty() {
            return Err(CadenaError::NoData("no days to backtest".to_string()));
        }
        for len in [predictions.len(), realized.len()] {
            if len != dates.len() {
                return Err(CadenaError::DimensionMismatch {
                    expected: dates.len(),
                    got: len,
                });
            }
        }

        let mut rows = Vec::with_capacity(dates.len());
        let mut growth = 1.0;
        for ((&date, &pred), &real) in dates.iter().zip(predictions.iter()).zip(realized.iter()) {
            let pos = self.position(pred);
            let pnl = f64::from(pos) * real;
            growth *= 1.0 + pnl;
            rows.push(BacktestRow {
                date,
                pred,
                pos,
                real,
                pnl,
                cum_pnl: growth - 1.0,
            });
        }

        let summary = summarize(&rows);
        Ok(BacktestResult { rows, summary })
    }
}

fn summarize(rows: &[BacktestRow]) -> BacktestSummary {
    let pnl: Vec<f64> = rows.iter().map(|r| r.pnl).collect();
    let cum: Vec<f64> = rows.iter().map(|r| r.cum_pnl).collect();

    let long_days = rows.iter().filter(|r| r.pos > 0).count();
    let short_days = rows.iter().filter(|r| r.pos < 0).count();
    let active = long_days + short_days;
    let wins = rows.iter().filter(|r| r.pos != 0 && r.pnl > 0.0).count();

    BacktestSummary {
        days: rows.len(),
        total_return: cum.last().copied().unwrap_or(0.0),
        sharpe: BacktestResult::calculate_sharpe(&pnl, TRADING_DAYS_PER_YEAR),
        max_drawdown: BacktestResult::calculate_max_drawdown(&cum),
        hit_rate: (active > 0).then(|| wins as f64 / active as f64),
        long_days,
        short_days,
        flat_days: rows.len() - active,
    }
}

/// Backtests a persisted model over the month encoded in its file name.
///
/// The scaler is applied (never re-fitted) to that month's feature rows.
pub fn run_backtest(
    table: &FeatureTable,
    model_path: &Path,
    scaler_path: &Path,
    threshold: f64,
) -> Result<BacktestResult> {
    let rule = ThresholdBacktest::new(threshold)?;
    let month = test_month_from_path(model_path)?;
    let (start, end) = month_window(month)?;

    let rows = table.date_range(start, end);
    if rows.is_empty() {
        return Err(CadenaError::InsufficientData(format!(
            "no feature rows between {start} and {end}"
        )));
    }

    let model = load_model(model_path)?;
    let scaler = load_scaler(scaler_path)?;

    let x = scaler.transform(table.features().slice(s![rows.clone(), ..]))?;
    let predictions = model.predict(x.view())?;
    let realized = table.target().slice(s![rows.clone()]);

    let result = rule.run(&table.dates()[rows], predictions.view(), realized)?;
    info!(
        model = model.name(),
        month = %start,
        days = result.summary.days,
        total_return = result.summary.total_return,
        "backtest finished"
    );
    Ok(result)
}
