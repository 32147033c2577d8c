//! Hyperparameter overrides for every model family.

use crate::boosting::{DepthwiseParams, LeafwiseParams};
use crate::linear::ElasticNetConfig;
use cadena_traits::Result;
use serde::{Deserialize, Serialize};

/// Hyperparameters for all model families.
///
/// Deserializes from JSON with per-field defaults, so a configuration file
/// only needs to name the values it overrides:
///
/// ```
/// use cadena_models::ModelParams;
///
/// let params: ModelParams = serde_json::from_str(r#"{"leafwise": {"num_leaves": 15}}"#).unwrap();
/// assert_eq!(params.leafwise.num_leaves, 15);
/// assert_eq!(params.leafwise.n_estimators, 400);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// ElasticNet settings.
    pub elastic_net: ElasticNetConfig,
    /// Depth-wise boosting settings.
    pub depthwise: DepthwiseParams,
    /// Leaf-wise boosting settings.
    pub leafwise: LeafwiseParams,
}

impl ModelParams {
    /// Validates every family's parameters.
    pub fn validate(&self) -> Result<()> {
        self.elastic_net.validate()?;
        self.depthwise.validate()?;
        self.leafwise.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ModelParams::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let params: ModelParams =
            serde_json::from_str(r#"{"elastic_net": {"alpha": 0.5}, "depthwise": {"max_depth": 2}}"#)
                .unwrap();
        assert_eq!(params.elastic_net.alpha, 0.5);
        assert_eq!(params.elastic_net.l1_ratio, 0.5);
        assert_eq!(params.depthwise.max_depth, 2);
        assert_eq!(params.leafwise, LeafwiseParams::default());
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let params: ModelParams =
            serde_json::from_str(r#"{"leafwise": {"bagging_fraction": 2.0}}"#).unwrap();
        assert!(params.validate().is_err());
    }
}
