//! CLI subcommand modules.
//!
//! This module contains the implementations for all cadena CLI subcommands.

pub(crate) mod backtest;
pub(crate) mod evaluate;
pub(crate) mod features;
pub(crate) mod models;
pub(crate) mod prepare;
pub(crate) mod train;

use anyhow::{Context, Result};
use cadena_eval::HarnessConfig;
use std::path::Path;

const BANNER_WIDTH: usize = 62;

/// Print a boxed section title.
pub(crate) fn banner(title: &str) {
    println!("\n╔{}╗", "═".repeat(BANNER_WIDTH));
    println!("║{title:^BANNER_WIDTH$}║");
    println!("╚{}╝\n", "═".repeat(BANNER_WIDTH));
}

/// Load the harness configuration, falling back to defaults without a file.
pub(crate) fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(p) => HarnessConfig::from_file(p)
            .with_context(|| format!("failed to read config {}", p.display())),
        None => Ok(HarnessConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults_and_file() {
        assert_eq!(load_config(None).unwrap(), HarnessConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"seed": 7, "models": ["en"]}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.models.len(), 1);

        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
    }
}
