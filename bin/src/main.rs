//! Cadena CLI binary.
//!
//! Runs the supplier-return forecasting pipeline: data preparation, feature
//! engineering, the rolling multi-horizon evaluation, monthly training and
//! the threshold backtest.

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "cadena")]
#[command(about = "Supplier-stock return forecasting and evaluation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available model families
    Models(cmd::models::ModelsCommand),

    /// Clean a raw price table
    Prepare(cmd::prepare::PrepareCommand),

    /// Build lagged and rolling features from a cleaned table
    Features(cmd::features::FeaturesCommand),

    /// Evaluate every model family at every horizon
    Evaluate(cmd::evaluate::EvaluateCommand),

    /// Train a model for one out-of-sample month
    Train(cmd::train::TrainCommand),

    /// Backtest a saved monthly model with a threshold rule
    Backtest(cmd::backtest::BacktestCommand),
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cadena=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Models(cmd) => cmd.run(),
        Commands::Prepare(cmd) => cmd.run(),
        Commands::Features(cmd) => cmd.run(),
        Commands::Evaluate(cmd) => cmd.run(),
        Commands::Train(cmd) => cmd.run(),
        Commands::Backtest(cmd) => cmd.run(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_evaluate() {
        let cli = Cli::try_parse_from([
            "cadena",
            "evaluate",
            "--features",
            "features.csv",
            "--horizons",
            "1,5",
            "--seed",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate(cmd) => {
                assert_eq!(cmd.horizons, Some(vec![1, 5]));
                assert_eq!(cmd.seed, Some(7));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_backtest_defaults() {
        let cli = Cli::try_parse_from(["cadena", "backtest", "--features", "f.csv"]).unwrap();
        match cli.command {
            Commands::Backtest(cmd) => {
                assert!(cmd.model.is_none());
                assert_eq!(cmd.threshold, 0.0025);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
