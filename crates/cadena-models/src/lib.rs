//! Regression models for the cadena forecasting harness.
//!
//! This crate provides three model families behind one training entry point:
//! - ElasticNet: penalized linear regression
//! - Depth-wise boosting: exact greedy gradient-boosted trees
//! - Leaf-wise boosting: histogram gradient-boosted trees
//!
//! Every fitted model implements [`cadena_traits::Regressor`] and serializes
//! to JSON through [`TrainedModel`].
//!
//! # Example
//!
//! ```
//! use cadena_models::{ModelFamily, ModelParams};
//! use cadena_traits::Regressor;
//! use ndarray::{Array1, Array2};
//!
//! let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
//! let y = Array1::from_iter((0..30).map(|i| i as f64 * 0.5));
//!
//! let model = ModelFamily::ElasticNet
//!     .train(x.view(), y.view(), &ModelParams::default(), 42)
//!     .unwrap();
//! assert_eq!(model.predict(x.view()).unwrap().len(), 30);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod boosting;
pub mod linear;
pub mod params;
pub mod registry;
pub mod trained;

// Re-export key types
pub use params::ModelParams;
pub use registry::{ModelFamily, ModelInfo, available_models, find_model};
pub use trained::TrainedModel;
