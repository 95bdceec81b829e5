//! Storage seams for the pipeline
//!
//! Each component receives the narrow store it needs as an `Arc<dyn …>`.
//! [`PgStore`] is the production implementation; [`MemoryStore`] keeps the
//! same contracts in process and is used by the integration tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{IngestionLogEntry, NewIngestionLogEntry, NewRowFailure, RowFailureEntry};
use crate::db::DbResult;
use crate::ingest::models::{CustomerRecord, RawRecord, UpsertOutcome};

/// One row of `staging.raw_customers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StagedRow {
    pub id: i64,
    pub batch_id: Uuid,
    pub source_file: String,
    pub row_index: i64,
    pub raw: serde_json::Value,
    pub ingested_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
}

/// Append-only raw capture
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Insert every record of a batch atomically; nothing is kept on error
    async fn insert_raw_batch(
        &self,
        batch_id: Uuid,
        source_file: &str,
        records: &[RawRecord],
    ) -> DbResult<u64>;

    async fn staged_rows(&self, batch_id: Uuid) -> DbResult<Vec<StagedRow>>;
}

/// Reporting entity keyed by `customer_id`
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Insert, or overwrite every column of the existing row
    async fn upsert_customer(&self, customer: &CustomerRecord) -> DbResult<UpsertOutcome>;

    async fn get_customer(&self, customer_id: &str) -> DbResult<Option<CustomerRecord>>;

    async fn count_customers(&self) -> DbResult<i64>;
}

/// Append-only ingestion audit trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_log_entry(&self, entry: &NewIngestionLogEntry) -> DbResult<IngestionLogEntry>;

    async fn append_row_failures(
        &self,
        batch_id: Uuid,
        file_name: &str,
        failures: &[NewRowFailure],
    ) -> DbResult<u64>;

    async fn recent_log_entries(&self, limit: i64) -> DbResult<Vec<IngestionLogEntry>>;

    async fn row_failures(&self, batch_id: Uuid) -> DbResult<Vec<RowFailureEntry>>;
}

/// Everything the orchestrator needs from one backing store
pub trait EtlStore: StagingStore + CustomerStore + AuditStore {}

impl<T: StagingStore + CustomerStore + AuditStore + ?Sized> EtlStore for T {}
