//! Models command implementation.

use crate::cmd::banner;
use anyhow::Result;
use cadena_models::{ModelFamily, ModelParams, available_models};
use clap::Args;

/// List the model families the harness evaluates.
#[derive(Args, Debug, Clone)]
pub(crate) struct ModelsCommand {
    /// Show descriptions and default hyperparameters
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl ModelsCommand {
    pub(crate) fn run(self) -> Result<()> {
        banner("Available Models");

        let params = ModelParams::default();
        for info in available_models() {
            println!(
                "  {:18} {:16} (artifacts: {}_*.json)",
                info.key, info.display_name, info.artifact_prefix
            );
            if self.verbose {
                println!("      {}", info.description);
                for line in default_params(info.family, &params)?.lines() {
                    println!("      {line}");
                }
                println!();
            }
        }

        if !self.verbose {
            println!("\nUse --verbose for descriptions and default parameters.\n");
        }
        Ok(())
    }
}

fn default_params(family: ModelFamily, params: &ModelParams) -> Result<String> {
    let json = match family {
        ModelFamily::ElasticNet => serde_json::to_string_pretty(&params.elastic_net)?,
        ModelFamily::DepthwiseBoost => serde_json::to_string_pretty(&params.depthwise)?,
        ModelFamily::LeafwiseBoost => serde_json::to_string_pretty(&params.leafwise)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_json() {
        let params = ModelParams::default();
        for family in ModelFamily::ALL {
            let text = default_params(family, &params).unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert!(value.is_object());
        }
    }
}
