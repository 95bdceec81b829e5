//! Ingestion audit trail
//!
//! A batch gets a summary entry in `etl.etl_logs` once transform-load
//! finishes, and a zero-row `ERROR: ...` entry when any step fails. A batch
//! that fails after transform-load (archival) therefore has both. Rows skipped
//! during transform-load are written to `etl.etl_row_failures` with their raw
//! payload, before the summary.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use churn_etl::audit::AuditLogger;
//! use churn_etl::store::PgStore;
//!
//! # async fn example(store: Arc<PgStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let audit = AuditLogger::new(store);
//! for entry in audit.recent_entries(10).await? {
//!     println!("{} {} -> {} ({})", entry.file_name, entry.rows_in, entry.rows_out, entry.notes);
//! }
//! # Ok(())
//! # }
//! ```

mod logger;
mod models;
pub(crate) mod queries;

pub use logger::AuditLogger;
pub use models::{
    clamp_limit, error_note, IngestionLogEntry, NewIngestionLogEntry, NewRowFailure,
    RowFailureEntry, DEFAULT_AUDIT_QUERY_LIMIT, ERROR_NOTE_PREFIX, MAX_AUDIT_QUERY_LIMIT,
    MAX_ERROR_NOTE_CHARS,
};
