//! Backtest command implementation.

use crate::cmd::{banner, load_config};
use anyhow::{Context, Result, bail};
use cadena_data::{load_feature_table, write_csv};
use cadena_eval::{
    BacktestSummary, find_models, run_backtest, scaler_path_for, test_month_from_path,
};
use cadena_models::ModelFamily;
use clap::Args;
use std::path::{Path, PathBuf};

/// Trade a saved monthly model's predictions with a threshold rule.
#[derive(Args, Debug, Clone)]
pub(crate) struct BacktestCommand {
    /// Feature CSV file
    #[arg(short, long)]
    pub(crate) features: PathBuf,

    /// Model artifact; defaults to the earliest ElasticNet model in the models directory
    #[arg(short, long)]
    pub(crate) model: Option<PathBuf>,

    /// Scaler artifact; defaults to the one saved next to the model
    #[arg(short, long)]
    pub(crate) scaler: Option<PathBuf>,

    /// Directory holding the artifacts
    #[arg(long, default_value = "models")]
    pub(crate) models_dir: PathBuf,

    /// Absolute predicted return needed to take a position
    #[arg(short, long, default_value = "0.0025")]
    pub(crate) threshold: f64,

    /// CSV file receiving the daily rows
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,

    /// JSON harness configuration providing the column names
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
}

impl BacktestCommand {
    pub(crate) fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        let model_path = match self.model {
            Some(ref path) => path.clone(),
            None => earliest_model(&self.models_dir)?,
        };
        let scaler_path = match self.scaler {
            Some(ref path) => path.clone(),
            None => scaler_path_for(&model_path)?,
        };
        let month = test_month_from_path(&model_path)?;

        banner("Threshold Backtest");
        println!("Model:     {}", model_path.display());
        println!("Scaler:    {}", scaler_path.display());
        println!("Month:     {}", month.format("%Y-%m"));
        println!("Threshold: {}", self.threshold);
        println!();

        let table = load_feature_table(&self.features, &config.schema())
            .with_context(|| format!("failed to load {}", self.features.display()))?;
        let result = run_backtest(&table, &model_path, &scaler_path, self.threshold)?;

        println!(
            "{:<12} {:>10} {:>4} {:>10} {:>10} {:>10}",
            "Date", "pred", "pos", "real", "pnl", "cum_pnl"
        );
        for row in &result.rows {
            println!(
                "{:<12} {:>10.5} {:>4} {:>10.5} {:>10.5} {:>10.5}",
                row.date.format("%Y-%m-%d").to_string(),
                row.pred,
                row.pos,
                row.real,
                row.pnl,
                row.cum_pnl
            );
        }
        println!();
        print_summary(&result.summary);

        if let Some(ref output) = self.output {
            write_csv(&mut result.to_frame()?, output)?;
            println!("Saved {}", output.display());
        }
        Ok(())
    }
}

fn earliest_model(dir: &Path) -> Result<PathBuf> {
    let models = find_models(dir, ModelFamily::ElasticNet)
        .with_context(|| format!("failed to list {}", dir.display()))?;
    match models.into_iter().next() {
        Some(path) => Ok(path),
        None => bail!(
            "no {}_*.json model in {}",
            ModelFamily::ElasticNet.artifact_prefix(),
            dir.display()
        ),
    }
}

fn print_summary(summary: &BacktestSummary) {
    let optional = |v: Option<f64>, scale: f64| {
        v.map_or_else(|| "n/a".to_string(), |x| format!("{:.2}", x * scale))
    };

    println!("Summary:");
    println!("{}", "-".repeat(40));
    println!("  Days:          {}", summary.days);
    println!("  Total return:  {:.2}%", summary.total_return * 100.0);
    println!("  Sharpe:        {}", optional(summary.sharpe, 1.0));
    println!("  Max drawdown:  {:.2}%", summary.max_drawdown * 100.0);
    println!("  Hit rate:      {}%", optional(summary.hit_rate, 100.0));
    println!(
        "  Long/short/flat: {}/{}/{}",
        summary.long_days, summary.short_days, summary.flat_days
    );
    println!();
}
