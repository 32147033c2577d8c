//! Features command implementation.

use crate::cmd::banner;
use anyhow::{Context, Result};
use cadena_data::{FeatureConfig, make_features, read_csv, write_csv};
use clap::Args;
use std::path::PathBuf;

/// Build lagged and rolling return features from a cleaned table.
#[derive(Args, Debug, Clone)]
pub(crate) struct FeaturesCommand {
    /// Cleaned CSV file
    #[arg(short, long)]
    pub(crate) input: PathBuf,

    /// Feature CSV file to write
    #[arg(short, long)]
    pub(crate) output: PathBuf,

    /// Date column
    #[arg(long, default_value = "Date")]
    pub(crate) date_column: String,

    /// Target return column
    #[arg(long, default_value = "vw_returns")]
    pub(crate) target: String,

    /// Substring marking return columns
    #[arg(long, default_value = "return")]
    pub(crate) return_marker: String,

    /// Number of lags per return column
    #[arg(long, default_value = "5")]
    pub(crate) lags: usize,

    /// Rolling window sizes
    #[arg(long, value_delimiter = ',', default_value = "3")]
    pub(crate) windows: Vec<usize>,

    /// Exogenous columns kept with a one-row lag
    #[arg(long, value_delimiter = ',', default_value = "bond_yeld")]
    pub(crate) exogenous: Vec<String>,
}

impl FeaturesCommand {
    pub(crate) fn run(self) -> Result<()> {
        banner("Feature Engineering");
        println!("Input:    {}", self.input.display());
        println!("Output:   {}", self.output.display());
        println!("Lags:     {}", self.lags);
        println!("Windows:  {:?}", self.windows);
        println!();

        let config = FeatureConfig {
            date_column: self.date_column,
            target_column: self.target,
            return_marker: self.return_marker,
            lags: self.lags,
            rolling_windows: self.windows,
            exogenous: self.exogenous,
        };

        let clean = read_csv(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        let mut features = make_features(&clean, &config)?;
        write_csv(&mut features, &self.output)?;

        println!(
            "Wrote {} rows x {} columns to {}",
            features.height(),
            features.width(),
            self.output.display()
        );
        Ok(())
    }
}
