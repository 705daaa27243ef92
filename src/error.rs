//! Error types for the cost_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the cost_forecast crate
#[derive(Debug, Error)]
pub enum CostError {
    /// A requested service has no rows in the combined billing table
    #[error("no billing data for service '{service}'")]
    MissingServiceData {
        /// Service identifier that was requested
        service: String,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    Data(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Model estimation failed or received input it cannot be fit on
    #[error("Model fit error: {0}")]
    ModelFit(String),

    /// A series is too short or too flat for the requested statistic
    #[error("Degenerate series: {0}")]
    Degenerate(String),

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    Math(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV serialization
    #[error("CSV error: {0}")]
    Csv(String),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, CostError>;

impl From<PolarsError> for CostError {
    fn from(err: PolarsError) -> Self {
        CostError::Polars(err.to_string())
    }
}

impl From<csv::Error> for CostError {
    fn from(err: csv::Error) -> Self {
        CostError::Csv(err.to_string())
    }
}
