//! Bookkeeping for `batch_runs`: one row per CLI batch, moving through
//! `queued` → `running` → `succeeded` | `failed`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{sql_limit, DbError};

const BATCH_RUN_COLUMNS: &str = "id, public_id, status, started_at, completed_at, \
                                 records_processed, records_with_price, error_message, created_at";

/// A row from the `batch_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// The schema defines this as `INTEGER NOT NULL DEFAULT 0`.
    pub records_processed: i32,
    /// The schema defines this as `INTEGER NOT NULL DEFAULT 0`.
    pub records_with_price: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creates a new batch run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_batch_run(pool: &PgPool) -> Result<BatchRunRow, DbError> {
    let row = sqlx::query_as::<_, BatchRunRow>(&format!(
        "INSERT INTO batch_runs (public_id, status) \
         VALUES ($1, 'queued') \
         RETURNING {BATCH_RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchRunTransition`] if the run is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_batch_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded` and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_batch_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    records_with_price: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_processed = $1, records_with_price = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(records_processed)
    .bind(records_with_price)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with `error_message`. A run that never got as far
/// as `running` (for example because starting it failed) can be failed
/// straight from `queued`.
///
/// # Errors
///
/// Returns [`DbError::InvalidBatchRunTransition`] if the run is neither
/// `queued` nor `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_batch_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE batch_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status IN ('queued', 'running')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidBatchRunTransition {
            id,
            expected_status: "queued or running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_batch_run(pool: &PgPool, id: i64) -> Result<BatchRunRow, DbError> {
    let row = sqlx::query_as::<_, BatchRunRow>(&format!(
        "SELECT {BATCH_RUN_COLUMNS} FROM batch_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_batch_runs(pool: &PgPool, limit: usize) -> Result<Vec<BatchRunRow>, DbError> {
    let rows = sqlx::query_as::<_, BatchRunRow>(&format!(
        "SELECT {BATCH_RUN_COLUMNS} FROM batch_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(sql_limit(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
