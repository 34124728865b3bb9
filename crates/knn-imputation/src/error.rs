//! Custom error types for the imputation engine.
//!
//! This module provides the error hierarchy using `thiserror` for every
//! failure the fill engine, the frame adapter and the service can surface.
//!
//! Errors are serializable as `{code, message}` so that an outer layer (HTTP
//! handler, CLI JSON output) can forward them without string matching.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for imputation.
#[derive(Error, Debug)]
pub enum ImputeError {
    /// The table has fewer rows than the configured batch size.
    #[error("Insufficient data: {rows} rows, at least {required} required")]
    InsufficientData { rows: usize, required: usize },

    /// KNN fallback was needed but the column holds no present values.
    #[error("No known values in column '{column}' to estimate row {row}")]
    EmptyNeighborhood { column: String, row: usize },

    /// The designated time column is absent from the input.
    #[error("Time column '{0}' not found")]
    MissingTimeColumn(String),

    /// A time value could not be interpreted as a timestamp.
    #[error("Invalid timestamp at row {row}: {value}")]
    InvalidTimestamp { row: usize, value: String },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Two inputs that must be row-aligned differ in length.
    #[error("Length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A row order is not a permutation of the table's rows.
    #[error("Invalid row order: index {index} is out of range or repeated for {rows} rows")]
    InvalidRowOrder { index: usize, rows: usize },

    /// Ground truth has no value where one is needed for scoring.
    #[error("Ground truth for column '{column}' is missing at row {row}")]
    InvalidGroundTruth { column: String, row: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputeError>,
    },
}

impl ImputeError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for callers that dispatch on the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::EmptyNeighborhood { .. } => "EMPTY_NEIGHBORHOOD",
            Self::MissingTimeColumn(_) => "MISSING_TIME_COLUMN",
            Self::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::LengthMismatch { .. } => "LENGTH_MISMATCH",
            Self::InvalidRowOrder { .. } => "INVALID_ROW_ORDER",
            Self::InvalidGroundTruth { .. } => "INVALID_GROUND_TRUTH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error only reports that the batch was too small.
    pub fn is_insufficient_data(&self) -> bool {
        match self {
            Self::InsufficientData { .. } => true,
            Self::WithContext { source, .. } => source.is_insufficient_data(),
            _ => false,
        }
    }

    /// Check if this error is recoverable (i.e., not a fundamental failure).
    ///
    /// A short batch can simply be retried once more rows have arrived.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientData { .. } | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ImputeError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputeError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputeError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ImputeError::InsufficientData {
                rows: 3,
                required: 10
            }
            .error_code(),
            "INSUFFICIENT_DATA"
        );
        assert_eq!(
            ImputeError::MissingTimeColumn("DateTime".to_string()).error_code(),
            "MISSING_TIME_COLUMN"
        );
    }

    #[test]
    fn test_is_recoverable() {
        let short = ImputeError::InsufficientData {
            rows: 3,
            required: 10,
        };
        assert!(short.is_recoverable());
        assert!(short.is_insufficient_data());

        let empty = ImputeError::EmptyNeighborhood {
            column: "temp".to_string(),
            row: 0,
        };
        assert!(!empty.is_recoverable());
        assert!(!empty.is_insufficient_data());
    }

    #[test]
    fn test_error_serialization() {
        let error = ImputeError::EmptyNeighborhood {
            column: "humidity".to_string(),
            row: 4,
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("EMPTY_NEIGHBORHOOD"));
        assert!(json.contains("humidity"));
    }

    #[test]
    fn test_with_context() {
        let error = ImputeError::ColumnNotFound("co2".to_string()).with_context("Aligning truth");
        assert!(error.to_string().contains("Aligning truth"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND"); // Preserves original code
    }

    #[test]
    fn test_context_preserves_insufficient_data() {
        let result: Result<()> = Err(ImputeError::InsufficientData {
            rows: 1,
            required: 2,
        });
        let error = result.context("batch 7").unwrap_err();
        assert!(error.is_insufficient_data());
        assert!(error.is_recoverable());
    }
}
