//! Data preparation for the cadena forecasting workspace.
//!
//! This crate turns the raw supplier price table into the feature table the
//! evaluation harness consumes:
//! - [`prepare`]: sort by date, derive the target if needed, impute return gaps
//! - [`make_features`]: lagged and rolling supplier returns plus exogenous series
//! - [`io`]: CSV reading and writing on top of polars
//!
//! # Example
//!
//! ```no_run
//! use cadena_data::{FeatureConfig, PrepareConfig, make_features, prepare};
//! use cadena_data::io::{read_csv, write_csv};
//!
//! # fn main() -> cadena_traits::Result<()> {
//! let raw = read_csv("data/vw_supplychain.csv")?;
//! let clean = prepare(&raw, &PrepareConfig::default())?;
//! let mut features = make_features(&clean, &FeatureConfig::default())?;
//! write_csv(&mut features, "data/vw_features.csv")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod features;
pub mod frame;
pub mod io;
pub mod prepare;

// Re-export key types
pub use features::{FeatureConfig, make_features};
pub use io::{load_feature_table, read_csv, write_csv};
pub use prepare::{PrepareConfig, prepare};
