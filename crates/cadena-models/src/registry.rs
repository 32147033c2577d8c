//! Model registry for discovering and training the available model families.
//!
//! This module maps each family to its display name, artifact prefix and
//! training adapter.

use crate::boosting::{DepthwiseBooster, LeafwiseBooster};
use crate::linear::ElasticNet;
use crate::params::ModelParams;
use crate::trained::TrainedModel;
use cadena_traits::{CadenaError, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Model family classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Penalized linear regression
    #[serde(alias = "en")]
    ElasticNet,
    /// Exact greedy boosting with depth-limited trees
    #[serde(alias = "xgb", alias = "depthwise")]
    DepthwiseBoost,
    /// Histogram boosting with leaf-limited trees
    #[serde(alias = "lgbm", alias = "leafwise")]
    LeafwiseBoost,
}

impl ModelFamily {
    /// Every family, in evaluation order.
    pub const ALL: [Self; 3] = [Self::ElasticNet, Self::DepthwiseBoost, Self::LeafwiseBoost];

    /// Stable identifier used in configuration files.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::ElasticNet => "elastic_net",
            Self::DepthwiseBoost => "depthwise_boost",
            Self::LeafwiseBoost => "leafwise_boost",
        }
    }

    /// Row label in result tables.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::ElasticNet => "Elastic Net",
            Self::DepthwiseBoost => "XGB-style GBT",
            Self::LeafwiseBoost => "LGBM-style GBT",
        }
    }

    /// File name prefix for persisted models.
    #[must_use]
    pub const fn artifact_prefix(&self) -> &'static str {
        match self {
            Self::ElasticNet => "en",
            Self::DepthwiseBoost => "xgb",
            Self::LeafwiseBoost => "lgbm",
        }
    }

    /// Get a human-readable description of the family.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ElasticNet => "L1/L2 penalized linear regression fitted by coordinate descent",
            Self::DepthwiseBoost => {
                "Second-order gradient boosting, exact greedy splits, depth-wise growth"
            }
            Self::LeafwiseBoost => {
                "Second-order gradient boosting, histogram splits, leaf-wise growth"
            }
        }
    }

    /// Fits a model of this family.
    ///
    /// `x` must already be scaled. Randomness in the boosters flows from
    /// `seed`; ElasticNet is deterministic and ignores it.
    pub fn train(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: &ModelParams,
        seed: u64,
    ) -> Result<TrainedModel> {
        debug!(family = self.key(), rows = x.nrows(), features = x.ncols(), "training");
        let model = match self {
            Self::ElasticNet => {
                TrainedModel::ElasticNet(ElasticNet::new(params.elastic_net.clone()).fit(x, y)?)
            }
            Self::DepthwiseBoost => TrainedModel::DepthwiseBoost(
                DepthwiseBooster::new(params.depthwise.clone()).fit(x, y, seed)?,
            ),
            Self::LeafwiseBoost => TrainedModel::LeafwiseBoost(
                LeafwiseBooster::new(params.leafwise.clone()).fit(x, y, seed)?,
            ),
        };
        Ok(model)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelFamily {
    type Err = CadenaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "elastic_net" | "elasticnet" | "en" => Ok(Self::ElasticNet),
            "depthwise_boost" | "depthwise" | "xgb" => Ok(Self::DepthwiseBoost),
            "leafwise_boost" | "leafwise" | "lgbm" => Ok(Self::LeafwiseBoost),
            other => Err(CadenaError::UnknownModel(other.to_string())),
        }
    }
}

/// Metadata about a model family.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// The family
    pub family: ModelFamily,

    /// Configuration key
    pub key: &'static str,

    /// Row label in result tables
    pub display_name: &'static str,

    /// Artifact file prefix
    pub artifact_prefix: &'static str,

    /// Human-readable description
    pub description: &'static str,
}

/// Get information about all available model families.
#[must_use]
pub fn available_models() -> Vec<ModelInfo> {
    ModelFamily::ALL
        .iter()
        .map(|family| ModelInfo {
            family: *family,
            key: family.key(),
            display_name: family.display_name(),
            artifact_prefix: family.artifact_prefix(),
            description: family.description(),
        })
        .collect()
}

/// Find a model family by any of its names.
pub fn find_model(name: &str) -> Result<ModelInfo> {
    let family: ModelFamily = name.parse()?;
    available_models()
        .into_iter()
        .find(|info| info.family == family)
        .ok_or_else(|| CadenaError::UnknownModel(name.to_string()))
}
