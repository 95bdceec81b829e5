//! Batch-level audit writer

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::models::{error_note, IngestionLogEntry, NewIngestionLogEntry, NewRowFailure};
use crate::db::DbResult;
use crate::ingest::models::RowFailure;
use crate::store::AuditStore;

#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Record the outcome of one transform-load pass
    pub async fn record_batch(
        &self,
        batch_id: Uuid,
        file_name: &str,
        rows_in: usize,
        rows_out: usize,
        duration_seconds: f64,
        notes: &str,
    ) -> DbResult<IngestionLogEntry> {
        let entry = NewIngestionLogEntry {
            batch_id: Some(batch_id),
            file_name: file_name.to_string(),
            rows_in: rows_in as i64,
            rows_out: rows_out as i64,
            duration_seconds,
            notes: notes.to_string(),
        };

        let record = self.store.append_log_entry(&entry).await?;
        info!(
            batch_id = %batch_id,
            file = %file_name,
            rows_in,
            rows_out,
            duration_seconds,
            notes = %notes,
            "Batch recorded"
        );

        Ok(record)
    }

    /// Persist the diagnostics of every skipped row
    pub async fn record_row_failures(
        &self,
        batch_id: Uuid,
        file_name: &str,
        failures: &[RowFailure],
    ) -> DbResult<u64> {
        let failures: Vec<NewRowFailure> = failures
            .iter()
            .map(|failure| NewRowFailure {
                row_index: failure.row_index as i64,
                error: failure.error.to_string(),
                row_data: failure.row.clone(),
            })
            .collect();

        self.store.append_row_failures(batch_id, file_name, &failures).await
    }

    /// Zero-row entry for a batch that could not be completed
    pub async fn record_failure(
        &self,
        batch_id: Option<Uuid>,
        file_name: &str,
        error: &(dyn std::error::Error + Send + Sync),
    ) -> DbResult<IngestionLogEntry> {
        let entry = NewIngestionLogEntry {
            batch_id,
            file_name: file_name.to_string(),
            rows_in: 0,
            rows_out: 0,
            duration_seconds: 0.0,
            notes: error_note(&error.to_string()),
        };

        let record = self.store.append_log_entry(&entry).await?;
        error!(file = %file_name, error = %error, "Batch failed");

        Ok(record)
    }

    pub async fn recent_entries(&self, limit: i64) -> DbResult<Vec<IngestionLogEntry>> {
        self.store.recent_log_entries(limit).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::RowError;
    use crate::store::MemoryStore;

    fn logger() -> (Arc<MemoryStore>, AuditLogger) {
        let store = Arc::new(MemoryStore::new());
        let logger = AuditLogger::new(store.clone());
        (store, logger)
    }

    #[tokio::test]
    async fn test_record_batch() {
        let (store, logger) = logger();
        let batch_id = Uuid::new_v4();

        logger
            .record_batch(batch_id, "feed.csv", 5, 4, 0.5, "Completed with 1 failed rows")
            .await
            .unwrap();

        let entries = store.log_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].batch_id, Some(batch_id));
        assert_eq!(entries[0].rows_in, 5);
        assert_eq!(entries[0].rows_out, 4);
    }

    #[tokio::test]
    async fn test_record_failure_truncates_message() {
        let (store, logger) = logger();
        let err = std::io::Error::other("x".repeat(500));

        logger.record_failure(None, "bad.csv", &err).await.unwrap();

        let entry = &store.log_entries()[0];
        assert_eq!(entry.rows_in, 0);
        assert_eq!(entry.rows_out, 0);
        assert_eq!(entry.duration_seconds, 0.0);
        assert!(entry.is_failure());
        assert_eq!(entry.notes.len(), "ERROR: ".len() + 200);
    }

    #[tokio::test]
    async fn test_record_row_failures() {
        let (store, logger) = logger();
        let batch_id = Uuid::new_v4();
        let failures = vec![RowFailure {
            row_index: 3,
            error: RowError::MissingCustomerId,
            row: serde_json::json!({"tenure": "2"}),
        }];

        let written = logger.record_row_failures(batch_id, "f.csv", &failures).await.unwrap();

        assert_eq!(written, 1);
        let stored = store.all_row_failures();
        assert_eq!(stored[0].row_index, 3);
        assert_eq!(stored[0].error, "customerID is missing or blank");
    }
}
