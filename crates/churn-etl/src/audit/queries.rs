//! Database queries for the ingestion audit tables

use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::models::{
    clamp_limit, IngestionLogEntry, NewIngestionLogEntry, NewRowFailure, RowFailureEntry,
};
use crate::db::DbResult;

/// Append one batch outcome to `etl.etl_logs`
///
/// Runs as its own statement so it commits independently of row processing.
pub async fn insert_log_entry(
    pool: &PgPool,
    entry: &NewIngestionLogEntry,
) -> DbResult<IngestionLogEntry> {
    let record = sqlx::query_as::<_, IngestionLogEntry>(
        r#"
        INSERT INTO etl.etl_logs (
            batch_id, file_name, rows_in, rows_out, duration_seconds, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, batch_id, file_name, rows_in, rows_out,
                  duration_seconds, notes, logged_at
        "#,
    )
    .bind(entry.batch_id)
    .bind(&entry.file_name)
    .bind(entry.rows_in)
    .bind(entry.rows_out)
    .bind(entry.duration_seconds)
    .bind(&entry.notes)
    .fetch_one(pool)
    .await?;

    debug!(
        log_id = record.id,
        file = %record.file_name,
        notes = %record.notes,
        "Created ingestion log entry"
    );

    Ok(record)
}

/// Append row failure details for one batch in a single transaction
pub async fn insert_row_failures(
    pool: &PgPool,
    batch_id: Uuid,
    file_name: &str,
    failures: &[NewRowFailure],
) -> DbResult<u64> {
    if failures.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0u64;

    for failure in failures {
        let result = sqlx::query(
            r#"
            INSERT INTO etl.etl_row_failures (batch_id, file_name, row_index, error, row_data)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(batch_id)
        .bind(file_name)
        .bind(failure.row_index)
        .bind(&failure.error)
        .bind(Json(&failure.row_data))
        .execute(&mut *tx)
        .await?;

        written += result.rows_affected();
    }

    tx.commit().await?;

    debug!(batch_id = %batch_id, count = written, "Recorded row failures");

    Ok(written)
}

/// Newest log entries first
pub async fn recent_log_entries(pool: &PgPool, limit: i64) -> DbResult<Vec<IngestionLogEntry>> {
    let records = sqlx::query_as::<_, IngestionLogEntry>(
        r#"
        SELECT id, batch_id, file_name, rows_in, rows_out,
               duration_seconds, notes, logged_at
        FROM etl.etl_logs
        ORDER BY logged_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(clamp_limit(limit))
    .fetch_all(pool)
    .await?;

    debug!(count = records.len(), "Queried ingestion log");

    Ok(records)
}

/// Row failures recorded for one batch, in input order
pub async fn row_failures_for_batch(
    pool: &PgPool,
    batch_id: Uuid,
) -> DbResult<Vec<RowFailureEntry>> {
    let records = sqlx::query_as::<_, RowFailureEntry>(
        r#"
        SELECT id, batch_id, file_name, row_index, error, row_data, logged_at
        FROM etl.etl_row_failures
        WHERE batch_id = $1
        ORDER BY row_index
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}
