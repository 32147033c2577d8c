//! Fitted model of any family, persisted as JSON.

use crate::boosting::BoostedEnsemble;
use crate::linear::ElasticNetModel;
use crate::registry::ModelFamily;
use cadena_traits::{Regressor, Result};
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A fitted model produced by [`ModelFamily::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TrainedModel {
    /// ElasticNet regression.
    ElasticNet(ElasticNetModel),
    /// Depth-wise boosted trees.
    DepthwiseBoost(BoostedEnsemble),
    /// Leaf-wise boosted trees.
    LeafwiseBoost(BoostedEnsemble),
}

impl TrainedModel {
    /// Family that produced this model.
    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        match self {
            Self::ElasticNet(_) => ModelFamily::ElasticNet,
            Self::DepthwiseBoost(_) => ModelFamily::DepthwiseBoost,
            Self::LeafwiseBoost(_) => ModelFamily::LeafwiseBoost,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Self::ElasticNet(m) => m,
            Self::DepthwiseBoost(m) | Self::LeafwiseBoost(m) => m,
        }
    }

    /// Serializes the model to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a model from JSON and checks its internal consistency.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        if let Self::DepthwiseBoost(m) | Self::LeafwiseBoost(m) = &model {
            m.validate()?;
        }
        Ok(model)
    }
}

impl Regressor for TrainedModel {
    fn name(&self) -> &str {
        self.family().key()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }
}
