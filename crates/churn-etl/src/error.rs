//! Pipeline error types
//!
//! [`RowError`] is recovered locally by the transform-load step: the row is
//! skipped and counted. [`IngestError`] is batch-level: the orchestrator marks
//! the batch failed and leaves the input file in the feed directory.

use thiserror::Error;

use crate::db::DbError;

/// Result type alias for batch-level operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Row-level transform or load failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("customerID is missing or blank")]
    MissingCustomerId,

    #[error("{field} must not be negative (got {value})")]
    NegativeValue { field: &'static str, value: String },

    #[error("{field} is out of range (got {value})")]
    OutOfRange { field: &'static str, value: String },

    #[error("store rejected row: {0}")]
    Store(String),
}

impl From<DbError> for RowError {
    fn from(err: DbError) -> Self {
        RowError::Store(err.to_string())
    }
}

/// Batch-level failure
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read batch: {0}")]
    Read(#[from] churn_common::EtlError),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
