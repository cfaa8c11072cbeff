//! Analytics error types

use farmstats_shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Configuration error: {field} ({reason})")]
    ConfigurationError { field: String, reason: String },

    #[error("Unknown benchmark profile: {name}")]
    UnknownBenchmark { name: String },

    #[error("Snapshot provider failed: {message}")]
    SnapshotUnavailable { message: String },

    #[error("Series contains a non-finite value at index {index}")]
    NonFiniteValue { index: usize },

    #[error("Invalid analysis parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Work item {id} panicked during execution")]
    TaskPanicked { id: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AnalyticsError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalyticsError::ConfigurationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        AnalyticsError::SnapshotUnavailable {
            message: message.into(),
        }
    }

    pub fn parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
