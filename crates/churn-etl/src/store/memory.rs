//! In-process store with the same contracts as [`super::PgStore`]
//!
//! Staging is all-or-nothing per call, customers are keyed by id, and audit
//! tables are append-only. Faults can be injected to exercise batch-level and
//! row-level error paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{AuditStore, CustomerStore, StagedRow, StagingStore};
use crate::audit::{clamp_limit, IngestionLogEntry, NewIngestionLogEntry, NewRowFailure, RowFailureEntry};
use crate::db::{DbError, DbResult};
use crate::ingest::models::{CustomerRecord, RawRecord, UpsertOutcome};

#[derive(Debug, Default)]
struct MemoryState {
    staged: Vec<StagedRow>,
    customers: BTreeMap<String, CustomerRecord>,
    log_entries: Vec<IngestionLogEntry>,
    row_failures: Vec<RowFailureEntry>,
    fail_staging: bool,
    fail_audit: bool,
    fail_row_failures: bool,
    rejected_customers: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every staging call fail without storing anything
    pub fn set_fail_staging(&self, fail: bool) {
        self.state().fail_staging = fail;
    }

    /// Make every audit write fail
    pub fn set_fail_audit(&self, fail: bool) {
        self.state().fail_audit = fail;
    }

    /// Make only row-failure writes fail
    pub fn set_fail_row_failures(&self, fail: bool) {
        self.state().fail_row_failures = fail;
    }

    /// Refuse upserts for one customer id
    pub fn reject_customer(&self, customer_id: impl Into<String>) {
        self.state().rejected_customers.insert(customer_id.into());
    }

    pub fn all_staged_rows(&self) -> Vec<StagedRow> {
        self.state().staged.clone()
    }

    pub fn customers(&self) -> Vec<CustomerRecord> {
        self.state().customers.values().cloned().collect()
    }

    pub fn log_entries(&self) -> Vec<IngestionLogEntry> {
        self.state().log_entries.clone()
    }

    pub fn all_row_failures(&self) -> Vec<RowFailureEntry> {
        self.state().row_failures.clone()
    }
}

#[async_trait]
impl StagingStore for MemoryStore {
    async fn insert_raw_batch(
        &self,
        batch_id: Uuid,
        source_file: &str,
        records: &[RawRecord],
    ) -> DbResult<u64> {
        let mut state = self.state();
        if state.fail_staging {
            return Err(DbError::rejected("staging batch", source_file, "staging unavailable"));
        }

        let inserted_at = Utc::now();
        let first_id = state.staged.len() as i64 + 1;
        let rows = records.iter().enumerate().map(|(offset, record)| StagedRow {
            id: first_id + offset as i64,
            batch_id,
            source_file: source_file.to_string(),
            row_index: record.row_index as i64,
            raw: record.payload(),
            ingested_at: record.ingested_at,
            inserted_at,
        });
        state.staged.extend(rows);

        Ok(records.len() as u64)
    }

    async fn staged_rows(&self, batch_id: Uuid) -> DbResult<Vec<StagedRow>> {
        Ok(self
            .state()
            .staged
            .iter()
            .filter(|row| row.batch_id == batch_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn upsert_customer(&self, customer: &CustomerRecord) -> DbResult<UpsertOutcome> {
        let mut state = self.state();
        if state.rejected_customers.contains(&customer.customer_id) {
            return Err(DbError::rejected("customer", &customer.customer_id, "rejected by store"));
        }

        let previous = state
            .customers
            .insert(customer.customer_id.clone(), customer.clone());

        Ok(match previous {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        })
    }

    async fn get_customer(&self, customer_id: &str) -> DbResult<Option<CustomerRecord>> {
        Ok(self.state().customers.get(customer_id).cloned())
    }

    async fn count_customers(&self) -> DbResult<i64> {
        Ok(self.state().customers.len() as i64)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_log_entry(&self, entry: &NewIngestionLogEntry) -> DbResult<IngestionLogEntry> {
        let mut state = self.state();
        if state.fail_audit {
            return Err(DbError::rejected("log entry", &entry.file_name, "audit unavailable"));
        }

        let record = IngestionLogEntry {
            id: state.log_entries.len() as i64 + 1,
            batch_id: entry.batch_id,
            file_name: entry.file_name.clone(),
            rows_in: entry.rows_in,
            rows_out: entry.rows_out,
            duration_seconds: entry.duration_seconds,
            notes: entry.notes.clone(),
            logged_at: Utc::now(),
        };
        state.log_entries.push(record.clone());

        Ok(record)
    }

    async fn append_row_failures(
        &self,
        batch_id: Uuid,
        file_name: &str,
        failures: &[NewRowFailure],
    ) -> DbResult<u64> {
        let mut state = self.state();
        if state.fail_audit || state.fail_row_failures {
            return Err(DbError::rejected("row failures", file_name, "audit unavailable"));
        }

        let logged_at = Utc::now();
        let first_id = state.row_failures.len() as i64 + 1;
        let entries = failures.iter().enumerate().map(|(offset, failure)| RowFailureEntry {
            id: first_id + offset as i64,
            batch_id,
            file_name: file_name.to_string(),
            row_index: failure.row_index,
            error: failure.error.clone(),
            row_data: failure.row_data.clone(),
            logged_at,
        });
        state.row_failures.extend(entries);

        Ok(failures.len() as u64)
    }

    async fn recent_log_entries(&self, limit: i64) -> DbResult<Vec<IngestionLogEntry>> {
        let limit = usize::try_from(clamp_limit(limit)).unwrap_or(usize::MAX);
        Ok(self
            .state()
            .log_entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn row_failures(&self, batch_id: Uuid) -> DbResult<Vec<RowFailureEntry>> {
        Ok(self
            .state()
            .row_failures
            .iter()
            .filter(|failure| failure.batch_id == batch_id)
            .cloned()
            .collect())
    }
}
