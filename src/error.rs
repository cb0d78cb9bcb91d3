//! Error types for the accident severity pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, SeverityError>;

/// Main error type for the pipeline.
///
/// Every stage propagates these unchanged; nothing in the crate catches and
/// recovers from them.
#[derive(Error, Debug)]
pub enum SeverityError {
    /// An expected column is missing, duplicated or has the wrong type
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A target value outside the fixed three-way label set
    #[error("Unknown severity label {label:?} at row {row}")]
    UnknownLabel { label: String, row: usize },

    /// A categorical value that was absent when the encoder was fitted
    #[error("Unseen category {value:?} in column '{column}'")]
    UnseenCategory { column: String, value: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    /// An operation invoked before its prerequisite stage ran
    #[error("State error: {0}")]
    StateError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl From<polars::error::PolarsError> for SeverityError {
    fn from(err: polars::error::PolarsError) -> Self {
        SeverityError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SeverityError {
    fn from(err: serde_json::Error) -> Self {
        SeverityError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for SeverityError {
    fn from(err: serde_yaml::Error) -> Self {
        SeverityError::ConfigError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SeverityError {
    fn from(err: ndarray::ShapeError) -> Self {
        SeverityError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SeverityError::SchemaError("missing column 'time'".to_string());
        assert_eq!(err.to_string(), "Schema error: missing column 'time'");

        let err = SeverityError::UnknownLabel { label: "Minor".to_string(), row: 4 };
        assert_eq!(err.to_string(), "Unknown severity label \"Minor\" at row 4");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SeverityError = io_err.into();
        assert!(matches!(err, SeverityError::IoError(_)));
    }

    #[test]
    fn test_error_from_yaml() {
        let yaml_err = serde_yaml::from_str::<Vec<u32>>("{not: [a list").unwrap_err();
        let err: SeverityError = yaml_err.into();
        assert!(matches!(err, SeverityError::ConfigError(_)));
    }
}
