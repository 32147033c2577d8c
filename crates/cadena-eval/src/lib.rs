//! Evaluation, monthly training and backtesting for cadena.
//!
//! This crate provides the out-of-sample machinery around the models:
//! - Horizon target shifting and chronological train/test splits
//! - Standardization fitted on the training partition only
//! - RMSE/MAE scoring and the rolling multi-horizon evaluation harness
//! - Monthly model training with JSON artifacts
//! - A long/flat/short threshold backtest of a persisted model
//!
//! # Example
//!
//! ```rust,ignore
//! use cadena_data::load_feature_table;
//! use cadena_eval::{HarnessConfig, RollingEvaluation};
//!
//! let config = HarnessConfig::default();
//! let table = load_feature_table("data/processed/features.csv", &config.schema())?;
//! let report = RollingEvaluation::new(config)?.run(&table);
//! println!("{}", report.render());
//! report.write_artifacts("outputs")?;
//! ```

pub mod artifact;
pub mod backtest;
pub mod harness;
pub mod metrics;
pub mod monthly;
pub mod scaler;
pub mod shift;
pub mod split;

// Re-export main types
pub use artifact::{
    ArtifactKind, ArtifactName, find_models, load_model, load_scaler, save_artifacts,
    scaler_path_for, test_month_from_path,
};
pub use backtest::{
    BacktestResult, BacktestRow, BacktestSummary, ThresholdBacktest, month_window, run_backtest,
};
pub use harness::{Cell, EvaluationReport, HarnessConfig, ResultRow, RollingEvaluation};
pub use metrics::{Evaluation, evaluate, mae, rmse};
pub use monthly::{MonthlyModel, month_start, parse_month, train_for_month};
pub use scaler::FittedScaler;
pub use shift::{HorizonFrame, align_horizon, shift_target};
pub use split::{ChronologicalSplit, SplitData};
