#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]

//! Core types and trait definitions for the cadena forecasting workspace.
//!
//! This crate provides the foundational abstractions shared by the model,
//! data and evaluation crates: the error type, the validated feature table,
//! forecast horizons, and the `Regressor` trait implemented by fitted models.

/// The version of the cadena-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod model;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{CadenaError, Result};
pub use model::Regressor;
pub use types::{Date, FeatureTable, Horizon, TableSchema, parse_date};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
