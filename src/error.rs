//! Error handling for loader operations.
//!
//! Provides error types with context for source reading, value coercion,
//! destination writes, and pipeline configuration failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read source file: {path} - {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Cannot coerce value '{value}' in column '{column}' (row {row}) to {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: &'static str,
    },

    #[error("Failed to write '{target}': {reason}")]
    Write { target: String, reason: String },

    #[error("Column '{column}' appears more than once after normalizing column names")]
    DuplicateColumn { column: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection not found: {id}")]
    ConnectionNotFound { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Task '{task_id}' failed: {reason}")]
    TaskFailed { task_id: String, reason: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl LoaderError {
    /// Create a read error for a source path
    pub fn read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a write error for a destination table or database
    pub fn write(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether an orchestrator may reasonably retry the failed invocation.
    ///
    /// Source and destination failures can be transient; bad data and bad
    /// configuration fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. } | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion_error_message_names_column_and_value() {
        let error = LoaderError::TypeCoercion {
            column: "price".to_string(),
            row: 3,
            value: "ten".to_string(),
            target: "f64",
        };

        let message = error.to_string();
        assert!(message.contains("'ten'"));
        assert!(message.contains("'price'"));
        assert!(message.contains("row 3"));
        assert!(message.contains("f64"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LoaderError::read("/tmp/missing.csv", "not found").is_retryable());
        assert!(LoaderError::write("building", "database is locked").is_retryable());
        assert!(!LoaderError::configuration("bad table name").is_retryable());
        assert!(
            !LoaderError::TypeCoercion {
                column: "quantity".to_string(),
                row: 0,
                value: "x".to_string(),
                target: "i64",
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_duplicate_column_is_permanent() {
        let error = LoaderError::DuplicateColumn {
            column: "unit_price".to_string(),
        };
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("unit_price"));
    }
}
