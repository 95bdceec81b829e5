//! PostgreSQL-backed store

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuditStore, CustomerStore, StagedRow, StagingStore};
use crate::audit::{queries, IngestionLogEntry, NewIngestionLogEntry, NewRowFailure, RowFailureEntry};
use crate::db::{DbError, DbResult};
use crate::ingest::models::{CustomerRecord, RawRecord, UpsertOutcome};

/// Store over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Constraint violations are reported as a rejection of the row
fn map_upsert_error(customer_id: &str, err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_check_violation() || db_err.is_unique_violation() {
            return DbError::rejected("customer", customer_id, db_err.message());
        }
    }
    DbError::Sqlx(err)
}

#[async_trait]
impl StagingStore for PgStore {
    async fn insert_raw_batch(
        &self,
        batch_id: Uuid,
        source_file: &str,
        records: &[RawRecord],
    ) -> DbResult<u64> {
        // Dropping the transaction on an early return rolls back the batch.
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO staging.raw_customers
                    (batch_id, source_file, row_index, raw, ingested_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(batch_id)
            .bind(source_file)
            .bind(record.row_index as i64)
            .bind(Json(record.payload()))
            .bind(record.ingested_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn staged_rows(&self, batch_id: Uuid) -> DbResult<Vec<StagedRow>> {
        let rows = sqlx::query_as::<_, StagedRow>(
            r#"
            SELECT id, batch_id, source_file, row_index, raw, ingested_at, inserted_at
            FROM staging.raw_customers
            WHERE batch_id = $1
            ORDER BY row_index
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn upsert_customer(&self, customer: &CustomerRecord) -> DbResult<UpsertOutcome> {
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO reporting.customers (
                customer_id, gender, senior_citizen, partner, dependents, tenure,
                phone_hash, email_hash, contract, monthly_charges, total_charges,
                churn, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (customer_id) DO UPDATE SET
                gender = EXCLUDED.gender,
                senior_citizen = EXCLUDED.senior_citizen,
                partner = EXCLUDED.partner,
                dependents = EXCLUDED.dependents,
                tenure = EXCLUDED.tenure,
                phone_hash = EXCLUDED.phone_hash,
                email_hash = EXCLUDED.email_hash,
                contract = EXCLUDED.contract,
                monthly_charges = EXCLUDED.monthly_charges,
                total_charges = EXCLUDED.total_charges,
                churn = EXCLUDED.churn,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&customer.customer_id)
        .bind(&customer.gender)
        .bind(customer.senior_citizen)
        .bind(&customer.partner)
        .bind(&customer.dependents)
        .bind(customer.tenure)
        .bind(&customer.phone_hash)
        .bind(&customer.email_hash)
        .bind(&customer.contract)
        .bind(customer.monthly_charges)
        .bind(customer.total_charges)
        .bind(customer.churn)
        .bind(customer.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_upsert_error(&customer.customer_id, e))?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn get_customer(&self, customer_id: &str) -> DbResult<Option<CustomerRecord>> {
        let customer = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT customer_id, gender, senior_citizen, partner, dependents, tenure,
                   phone_hash, email_hash, contract, monthly_charges, total_charges,
                   churn, updated_at
            FROM reporting.customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn count_customers(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reporting.customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append_log_entry(&self, entry: &NewIngestionLogEntry) -> DbResult<IngestionLogEntry> {
        queries::insert_log_entry(&self.pool, entry).await
    }

    async fn append_row_failures(
        &self,
        batch_id: Uuid,
        file_name: &str,
        failures: &[NewRowFailure],
    ) -> DbResult<u64> {
        queries::insert_row_failures(&self.pool, batch_id, file_name, failures).await
    }

    async fn recent_log_entries(&self, limit: i64) -> DbResult<Vec<IngestionLogEntry>> {
        queries::recent_log_entries(&self.pool, limit).await
    }

    async fn row_failures(&self, batch_id: Uuid) -> DbResult<Vec<RowFailureEntry>> {
        queries::row_failures_for_batch(&self.pool, batch_id).await
    }
}
