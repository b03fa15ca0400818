//! Postgres-backed [`ResultStore`] over the `results` table.

use chrono::{DateTime, Utc};
use pricewatch_core::{PriceResult, ResultStatus, Stats};
use sqlx::PgPool;

use crate::{sql_limit, DbError, ResultStore};

/// SQL form of `PriceResult::has_price`: fetched, with a finite price.
const HAS_PRICE_SQL: &str = "status IN ('success', 'no_price_found') \
                             AND price IS NOT NULL \
                             AND price NOT IN ('NaN', 'Infinity', '-Infinity')";

const RESULT_COLUMNS: &str = "id, identity, url, title, description, keywords, status, \
                              http_status, price, raw_price, error_message, checked_at, \
                              created_at, updated_at";

/// A row from the `results` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResultRow {
    pub id: i64,
    pub identity: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub status: String,
    /// `INTEGER NULL`; HTTP status codes always fit in `u16`.
    pub http_status: Option<i32>,
    pub price: Option<f64>,
    pub raw_price: Option<String>,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for PriceResult {
    type Error = DbError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let status: ResultStatus = row.status.parse().map_err(|reason| DbError::CorruptRow {
            identity: row.identity.clone(),
            reason,
        })?;
        let http_status = row
            .http_status
            .map(u16::try_from)
            .transpose()
            .map_err(|e| DbError::CorruptRow {
                identity: row.identity.clone(),
                reason: format!("http_status out of range: {e}"),
            })?;

        Ok(PriceResult {
            identity: row.identity,
            url: row.url,
            title: row.title,
            description: row.description,
            keywords: row.keywords,
            status,
            price: row.price,
            raw_price: row.raw_price,
            http_status,
            error_message: row.error_message,
            checked_at: row.checked_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetches a single result by identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if nothing is stored under `identity`,
    /// [`DbError::CorruptRow`] if the stored row cannot be decoded, or
    /// [`DbError::Sqlx`] if the query fails.
    pub async fn get(&self, identity: &str) -> Result<PriceResult, DbError> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE identity = $1"
        ))
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        PriceResult::try_from(row)
    }
}

impl ResultStore for PgResultStore {
    /// `INSERT ... ON CONFLICT (identity) DO UPDATE`; atomic per row, so
    /// concurrent upserts of different identities never interfere.
    async fn upsert(&self, result: &PriceResult) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO results \
                 (identity, url, title, description, keywords, status, http_status, \
                  price, raw_price, error_message, checked_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (identity) DO UPDATE SET \
                 url = EXCLUDED.url, \
                 title = EXCLUDED.title, \
                 description = EXCLUDED.description, \
                 keywords = EXCLUDED.keywords, \
                 status = EXCLUDED.status, \
                 http_status = EXCLUDED.http_status, \
                 price = EXCLUDED.price, \
                 raw_price = EXCLUDED.raw_price, \
                 error_message = EXCLUDED.error_message, \
                 checked_at = EXCLUDED.checked_at, \
                 updated_at = NOW()",
        )
        .bind(&result.identity)
        .bind(&result.url)
        .bind(&result.title)
        .bind(&result.description)
        .bind(&result.keywords)
        .bind(result.status.as_str())
        .bind(result.http_status.map(i32::from))
        .bind(result.price)
        .bind(result.raw_price.as_deref())
        .bind(result.error_message.as_deref())
        .bind(result.checked_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(identity = %result.identity, status = %result.status, "result upserted");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<PriceResult>, DbError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PriceResult::try_from).collect()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PriceResult>, DbError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results \
             ORDER BY checked_at DESC, id DESC \
             LIMIT $1"
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PriceResult::try_from).collect()
    }

    /// Aggregated in Postgres so the full history never leaves the database.
    async fn stats(&self) -> Result<Stats, DbError> {
        let (total, with_price, average_price) =
            sqlx::query_as::<_, (i64, i64, Option<f64>)>(&format!(
                "SELECT COUNT(*), \
                        COUNT(*) FILTER (WHERE {HAS_PRICE_SQL}), \
                        AVG(price) FILTER (WHERE {HAS_PRICE_SQL}) \
                 FROM results"
            ))
            .fetch_one(&self.pool)
            .await?;

        Ok(Stats {
            total_records: usize::try_from(total).unwrap_or(0),
            records_with_price: usize::try_from(with_price).unwrap_or(0),
            average_price,
        })
    }
}
