//! Evaluate command implementation.

use crate::cmd::{banner, load_config};
use anyhow::{Context, Result};
use cadena_data::load_feature_table;
use cadena_eval::{HarnessConfig, RollingEvaluation};
use cadena_traits::Horizon;
use clap::Args;
use std::path::PathBuf;
use tracing::warn;

/// Evaluate every configured model family at every horizon.
#[derive(Args, Debug, Clone)]
pub(crate) struct EvaluateCommand {
    /// Feature CSV file
    #[arg(short, long)]
    pub(crate) features: PathBuf,

    /// JSON harness configuration
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Directory receiving the result tables
    #[arg(short, long)]
    pub(crate) output_dir: Option<PathBuf>,

    /// Forecast horizons in rows
    #[arg(short = 'H', long, value_delimiter = ',')]
    pub(crate) horizons: Option<Vec<usize>>,

    /// Seed for the stochastic learners
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Target return column
    #[arg(long)]
    pub(crate) target: Option<String>,

    /// Date column
    #[arg(long)]
    pub(crate) date_column: Option<String>,
}

impl EvaluateCommand {
    /// Apply command-line overrides on top of the file configuration.
    pub(crate) fn resolve(&self) -> Result<HarnessConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(ref horizons) = self.horizons {
            config.horizons = horizons
                .iter()
                .map(|h| Horizon::new(*h))
                .collect::<cadena_traits::Result<_>>()?;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(ref target) = self.target {
            config.target_column = target.clone();
        }
        if let Some(ref date_column) = self.date_column {
            config.date_column = date_column.clone();
        }
        Ok(config)
    }

    pub(crate) fn run(self) -> Result<()> {
        let config = self.resolve()?;

        banner("Rolling Evaluation");
        println!("Features: {}", self.features.display());
        println!(
            "Horizons: {}",
            config
                .horizons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Models:   {}", config.models.len());
        println!("Seed:     {}", config.seed);
        println!();

        let table = load_feature_table(&self.features, &config.schema())
            .with_context(|| format!("failed to load {}", self.features.display()))?;
        println!(
            "Loaded {} rows with {} predictors",
            table.len(),
            table.n_features()
        );

        let output_dir = config.output_dir.clone();
        let report = RollingEvaluation::new(config)?.run(&table);
        println!("{}", report.render());

        if report.n_failed() > 0 {
            warn!(failed = report.n_failed(), "some cells could not be evaluated");
        }

        for path in report.write_artifacts(&output_dir)? {
            println!("Saved {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> EvaluateCommand {
        EvaluateCommand {
            features: PathBuf::from("features.csv"),
            config: None,
            output_dir: None,
            horizons: None,
            seed: None,
            target: None,
            date_column: None,
        }
    }

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(command().resolve().unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_resolve_overrides() {
        let cmd = EvaluateCommand {
            horizons: Some(vec![2, 10]),
            seed: Some(1),
            output_dir: Some(PathBuf::from("out")),
            target: Some("ret".to_string()),
            ..command()
        };
        let config = cmd.resolve().unwrap();
        assert_eq!(config.horizons, vec![Horizon::new(2).unwrap(), Horizon::new(10).unwrap()]);
        assert_eq!(config.seed, 1);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.target_column, "ret");
    }

    #[test]
    fn test_resolve_rejects_zero_horizon() {
        let cmd = EvaluateCommand {
            horizons: Some(vec![0]),
            ..command()
        };
        assert!(cmd.resolve().is_err());
    }
}
