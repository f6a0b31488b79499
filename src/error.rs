//! Error types for csvpush
//!
//! `AppError` covers failures that end the run. `PublishError` covers per-row
//! failures that are reported through the event sink and never abort the run.

use thiserror::Error;

/// Fatal error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to open input {path}: {source}")]
    SourceOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read input {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Input {path} has no header row")]
    MissingHeader { path: String },

    #[error("Invalid schema for metric '{metric}': {reason}")]
    InvalidSchema { metric: String, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Per-row publishing failure
///
/// Each variant is recovered locally: the row is reported and processing
/// continues with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Gauge is not created: define a schema before publishing")]
    SchemaNotDefined,

    #[error("Row has {actual} values but the schema has {expected} labels")]
    RowShapeMismatch { expected: usize, actual: usize },

    #[error("Push to {endpoint} failed: {reason}")]
    EndpointPush { endpoint: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_missing_header_names_path() {
        let err = AppError::MissingHeader {
            path: "empty.csv".to_string(),
        };
        assert_eq!(err.to_string(), "Input empty.csv has no header row");
    }

    #[test]
    fn test_source_open_preserves_io_error() {
        let err = AppError::SourceOpen {
            path: "missing.csv".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let source = err.source().expect("SourceOpen should carry its io::Error");
        assert!(source.is::<std::io::Error>());
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_invalid_schema_message() {
        let err = AppError::InvalidSchema {
            metric: "up".to_string(),
            reason: "duplicate label name 'region'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid schema for metric 'up': duplicate label name 'region'"
        );
    }

    #[test]
    fn test_row_shape_mismatch_message() {
        let err = PublishError::RowShapeMismatch {
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Row has 3 values but the schema has 2 labels"
        );
    }

    #[test]
    fn test_endpoint_push_message() {
        let err = PublishError::EndpointPush {
            endpoint: "http://localhost:9091".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Push to http://localhost:9091 failed: connection refused"
        );
    }
}
