//! Raw staging writer

use std::sync::Arc;
use uuid::Uuid;

use super::models::RawRecord;
use crate::db::DbResult;
use crate::store::StagingStore;

#[derive(Clone)]
pub struct StagingWriter {
    store: Arc<dyn StagingStore>,
}

impl StagingWriter {
    pub fn new(store: Arc<dyn StagingStore>) -> Self {
        Self { store }
    }

    /// Stage every record of a batch, or none of them.
    ///
    /// Returns the number of staging rows written. An empty batch writes
    /// nothing and succeeds.
    pub async fn stage(
        &self,
        batch_id: Uuid,
        records: &[RawRecord],
        source_file: &str,
    ) -> DbResult<u64> {
        if records.is_empty() {
            tracing::info!(batch_id = %batch_id, file = %source_file, "Nothing to stage");
            return Ok(0);
        }

        let staged = self.store.insert_raw_batch(batch_id, source_file, records).await?;
        tracing::info!(batch_id = %batch_id, file = %source_file, rows = staged, "Batch staged");

        Ok(staged)
    }
}
