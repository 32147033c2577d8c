//! Error types for the cadena workspace.
//!
//! Every stage boundary (loading, shifting, splitting, scaling, training,
//! evaluation) reports failures through [`CadenaError`] instead of letting
//! NaN or empty matrices flow downstream.

use thiserror::Error;

/// The main error type for cadena operations.
#[derive(Debug, Error)]
pub enum CadenaError {
    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// An operation received zero rows where at least one is required.
    #[error("No data: {0}")]
    NoData(String),

    /// Two inputs that must agree in size do not.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length or column count
        expected: usize,
        /// Actual length or column count
        got: usize,
    },

    /// A hyperparameter or configuration value is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model fitting failed.
    #[error("Training failed: {0}")]
    Training(String),

    /// An iterative solver stopped at its iteration cap.
    #[error("Solver did not converge after {iterations} iterations")]
    NotConverged {
        /// Number of iterations performed
        iterations: usize,
    },

    /// Error when a model family name is not recognised.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Error when a date is out of range or invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error for persisted artifacts.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for CadenaError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for CadenaError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for cadena operations.
pub type Result<T> = std::result::Result<T, CadenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CadenaError::InsufficientData("horizon 20 needs more than 10 rows".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data: horizon 20 needs more than 10 rows"
        );

        let err = CadenaError::MissingColumn("vw_returns".to_string());
        assert_eq!(err.to_string(), "Missing required column: vw_returns");

        let err = CadenaError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn test_error_from_string() {
        let err: CadenaError = "boom".into();
        assert!(matches!(err, CadenaError::Other(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: CadenaError = io.into();
        assert!(matches!(err, CadenaError::Io(_)));
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: Result<i32> = Err(CadenaError::NotConverged { iterations: 10 });
        assert!(err_result.is_err());
    }
}
