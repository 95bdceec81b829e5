//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ============================================================================
// Audit Query Constants
// ============================================================================

/// Default number of log entries returned by the status report
pub const DEFAULT_AUDIT_QUERY_LIMIT: i64 = 20;

/// Maximum number of log entries that can be returned in a single query.
pub const MAX_AUDIT_QUERY_LIMIT: i64 = 1000;

/// Maximum number of characters of an error message kept in batch notes
pub const MAX_ERROR_NOTE_CHARS: usize = 200;

/// Prefix of the notes of a failed batch entry
pub const ERROR_NOTE_PREFIX: &str = "ERROR: ";

/// One batch outcome from `etl.etl_logs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngestionLogEntry {
    pub id: i64,
    /// Batch that produced the entry (absent for entries written outside a run)
    pub batch_id: Option<Uuid>,
    pub file_name: String,
    pub rows_in: i64,
    pub rows_out: i64,
    pub duration_seconds: f64,
    /// `OK`, `Completed with N failed rows` or `ERROR: ...`
    pub notes: String,
    pub logged_at: DateTime<Utc>,
}

impl IngestionLogEntry {
    pub fn is_failure(&self) -> bool {
        self.notes.starts_with(ERROR_NOTE_PREFIX)
    }

    pub fn rows_failed(&self) -> i64 {
        self.rows_in - self.rows_out
    }
}

/// Log entry to be appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIngestionLogEntry {
    pub batch_id: Option<Uuid>,
    pub file_name: String,
    pub rows_in: i64,
    pub rows_out: i64,
    pub duration_seconds: f64,
    pub notes: String,
}

/// Diagnostic detail for one skipped input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRowFailure {
    pub row_index: i64,
    pub error: String,
    /// Raw row payload as staged
    pub row_data: JsonValue,
}

/// Stored row failure from `etl.etl_row_failures`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RowFailureEntry {
    pub id: i64,
    pub batch_id: Uuid,
    pub file_name: String,
    pub row_index: i64,
    pub error: String,
    pub row_data: JsonValue,
    pub logged_at: DateTime<Utc>,
}

/// Clamp a requested entry count into `1..=MAX_AUDIT_QUERY_LIMIT`
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_AUDIT_QUERY_LIMIT)
}

/// Notes for a failed batch: prefix plus the message cut to
/// [`MAX_ERROR_NOTE_CHARS`] characters
pub fn error_note(message: &str) -> String {
    let truncated: String = message.chars().take(MAX_ERROR_NOTE_CHARS).collect();
    format!("{}{}", ERROR_NOTE_PREFIX, truncated)
}
