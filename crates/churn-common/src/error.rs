//! Error types shared across the churn ETL crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Main error type for file-level failures
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl EtlError {
    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
