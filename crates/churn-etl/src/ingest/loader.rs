//! Transform-load engine
//!
//! Turns staged raw records into reporting rows, one upsert per record. A
//! row that fails to transform or load is logged and skipped; its siblings
//! are unaffected. The batch summary and row diagnostics are written to the
//! audit trail once every row has been attempted.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use super::models::{LoadStats, RawRecord, RowFailure, UpsertOutcome};
use super::transform::CustomerTransformer;
use crate::audit::AuditLogger;
use crate::error::{IngestResult, RowError};
use crate::store::CustomerStore;

#[derive(Clone)]
pub struct TransformLoader {
    store: Arc<dyn CustomerStore>,
    audit: AuditLogger,
    transformer: CustomerTransformer,
}

impl TransformLoader {
    pub fn new(store: Arc<dyn CustomerStore>, audit: AuditLogger) -> Self {
        Self::with_transformer(store, audit, CustomerTransformer::default())
    }

    pub fn with_transformer(
        store: Arc<dyn CustomerStore>,
        audit: AuditLogger,
        transformer: CustomerTransformer,
    ) -> Self {
        Self {
            store,
            audit,
            transformer,
        }
    }

    async fn load_row(&self, record: &RawRecord) -> Result<UpsertOutcome, RowError> {
        let customer = self.transformer.transform(record, Utc::now())?;
        Ok(self.store.upsert_customer(&customer).await?)
    }

    /// Transform and upsert every record, then audit the batch.
    ///
    /// Only an audit write failure is returned as an error; row failures are
    /// reported in [`LoadStats::failures`].
    pub async fn transform_and_load(
        &self,
        batch_id: Uuid,
        records: &[RawRecord],
        source_file: &str,
    ) -> IngestResult<LoadStats> {
        let started = Instant::now();
        let mut stats = LoadStats {
            rows_in: records.len(),
            ..LoadStats::default()
        };

        for record in records {
            match self.load_row(record).await {
                Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
                Ok(UpsertOutcome::Updated) => stats.updated += 1,
                Err(err) => {
                    error!(
                        batch_id = %batch_id,
                        file = %source_file,
                        row_index = record.row_index,
                        error = %err,
                        "Row skipped"
                    );
                    stats.failures.push(RowFailure {
                        row_index: record.row_index,
                        error: err,
                        row: record.payload(),
                    });
                }
            }
        }

        stats.rows_out = stats.rows_in - stats.failed();
        stats.duration_seconds = started.elapsed().as_secs_f64();

        info!(
            batch_id = %batch_id,
            file = %source_file,
            rows_in = stats.rows_in,
            rows_out = stats.rows_out,
            inserted = stats.inserted,
            updated = stats.updated,
            failed = stats.failed(),
            "Transform-load complete"
        );

        // Row failures go in before the summary
        self.audit
            .record_row_failures(batch_id, source_file, &stats.failures)
            .await?;
        self.audit
            .record_batch(
                batch_id,
                source_file,
                stats.rows_in,
                stats.rows_out,
                stats.duration_seconds,
                &stats.notes(),
            )
            .await?;

        Ok(stats)
    }
}
