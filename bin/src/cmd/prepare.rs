//! Prepare command implementation.

use crate::cmd::banner;
use anyhow::{Context, Result};
use cadena_data::{PrepareConfig, prepare, read_csv, write_csv};
use clap::Args;
use std::path::PathBuf;

/// Sort, impute and derive the target of a raw price table.
#[derive(Args, Debug, Clone)]
pub(crate) struct PrepareCommand {
    /// Raw CSV file
    #[arg(short, long)]
    pub(crate) input: PathBuf,

    /// Cleaned CSV file to write
    #[arg(short, long)]
    pub(crate) output: PathBuf,

    /// Date column
    #[arg(long, default_value = "Date")]
    pub(crate) date_column: String,

    /// Target return column
    #[arg(long, default_value = "vw_returns")]
    pub(crate) target: String,

    /// Close price column used when the target column is absent
    #[arg(long)]
    pub(crate) close_column: Option<String>,

    /// Substring marking return columns
    #[arg(long, default_value = "return")]
    pub(crate) return_marker: String,
}

impl PrepareCommand {
    pub(crate) fn run(self) -> Result<()> {
        banner("Data Preparation");
        println!("Input:    {}", self.input.display());
        println!("Output:   {}", self.output.display());
        println!("Target:   {}", self.target);
        println!();

        let config = PrepareConfig {
            date_column: self.date_column,
            target_column: self.target,
            close_column: self.close_column,
            return_marker: self.return_marker,
        };

        let raw = read_csv(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        let mut clean = prepare(&raw, &config)?;
        write_csv(&mut clean, &self.output)?;

        println!(
            "Wrote {} rows x {} columns to {}",
            clean.height(),
            clean.width(),
            self.output.display()
        );
        Ok(())
    }
}
