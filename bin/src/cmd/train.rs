//! Train command implementation.

use crate::cmd::{banner, load_config};
use anyhow::{Context, Result};
use cadena_data::load_feature_table;
use cadena_eval::{parse_month, save_artifacts, train_for_month};
use cadena_models::ModelFamily;
use clap::Args;
use std::path::PathBuf;

/// Train one model on every row before a month and save it with its scaler.
#[derive(Args, Debug, Clone)]
pub(crate) struct TrainCommand {
    /// Feature CSV file
    #[arg(short, long)]
    pub(crate) features: PathBuf,

    /// Out-of-sample month (YYYY-MM or YYYY-MM-DD)
    #[arg(long)]
    pub(crate) month: String,

    /// Model family (en, xgb, lgbm or the full key)
    #[arg(short, long, default_value = "en")]
    pub(crate) model: String,

    /// Directory receiving the artifacts
    #[arg(long, default_value = "models")]
    pub(crate) models_dir: PathBuf,

    /// JSON harness configuration providing hyperparameters
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Seed for the stochastic learners
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

impl TrainCommand {
    pub(crate) fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        let family: ModelFamily = self.model.parse()?;
        let month = parse_month(&self.month)?;
        let seed = self.seed.unwrap_or(config.seed);

        banner("Monthly Training");
        println!("Model:    {}", family.display_name());
        println!("Month:    {month}");
        println!("Seed:     {seed}");
        println!();

        let table = load_feature_table(&self.features, &config.schema())
            .with_context(|| format!("failed to load {}", self.features.display()))?;
        let trained = train_for_month(&table, family, &config.params, seed, month)?;
        let (model_path, scaler_path) = save_artifacts(&self.models_dir, &trained)?;

        println!(
            "Trained on {} rows; {} rows fall in the test month",
            trained.train_rows, trained.test_rows
        );
        println!("Saved {}", model_path.display());
        println!("Saved {}", scaler_path.display());
        Ok(())
    }
}
