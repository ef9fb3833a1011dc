//! Error types for the Kolosal time series pipeline

use crate::dataset::FieldName;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for preprocessing, windowing and forecasting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KolosalError {
    #[error("Missing field: transform '{transform}' requires field '{field}'")]
    MissingFieldError { transform: String, field: FieldName },

    #[error("Shape mismatch in transform '{transform}' for field '{field}': expected {expected}, got {actual}")]
    ShapeMismatchError {
        transform: String,
        field: FieldName,
        expected: String,
        actual: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfigurationError(String),

    #[error("Insufficient history: series length {series_length} is shorter than context length {context_length} and padding is disabled")]
    InsufficientHistoryError {
        series_length: usize,
        context_length: usize,
    },

    #[error("Invalid quantile: {0} is outside (0, 1)")]
    InvalidQuantileError(f64),

    #[error("Invalid shape: {0}")]
    ShapeError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),
}

impl KolosalError {
    /// Shorthand for a missing field raised by `transform`
    pub fn missing(transform: impl Into<String>, field: FieldName) -> Self {
        KolosalError::MissingFieldError {
            transform: transform.into(),
            field,
        }
    }

    /// Shorthand for a time length disagreement raised by `transform`
    pub fn shape_mismatch(
        transform: impl Into<String>,
        field: FieldName,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        KolosalError::ShapeMismatchError {
            transform: transform.into(),
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        KolosalError::InvalidConfigurationError(msg.into())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ShapeError(err.to_string())
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}
