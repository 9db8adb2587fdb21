//! Database operations for `supply_commitments`.
//!
//! Sync only ever creates missing rows. `captured_qty` and `captured_by`
//! belong to manual capture.

use chrono::{DateTime, NaiveDate, Utc};
use floradesk_core::CommitmentSnapshot;
use sqlx::PgPool;

use crate::DbError;

/// Captor recorded on rows created by a sync pass.
pub const SYNC_CAPTOR: &str = "Shopify Sync";

/// A row from the `supply_commitments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommitmentRow {
    pub id: i64,
    pub variety_id: i64,
    pub delivery_date: NaiveDate,
    pub demand_qty: i32,
    pub captured_qty: i32,
    pub captured_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommitment {
    pub variety_id: i64,
    pub delivery_date: NaiveDate,
    pub demand_qty: i32,
    pub captured_qty: i32,
    pub captured_by: String,
}

impl NewCommitment {
    /// Zeroed placeholder created by a sync pass.
    #[must_use]
    pub fn placeholder(variety_id: i64, delivery_date: NaiveDate) -> Self {
        Self {
            variety_id,
            delivery_date,
            demand_qty: 0,
            captured_qty: 0,
            captured_by: SYNC_CAPTOR.to_string(),
        }
    }
}

const COMMITMENT_COLUMNS: &str = "id, variety_id, delivery_date, demand_qty, captured_qty, \
                                  captured_by, created_at, updated_at";

/// Existing `(variety_id, delivery_date)` pairs for the given varieties.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn commitment_keys_for_varieties(
    pool: &PgPool,
    variety_ids: &[i64],
) -> Result<Vec<(i64, NaiveDate)>, DbError> {
    if variety_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, (i64, NaiveDate)>(
        "SELECT variety_id, delivery_date FROM supply_commitments \
         WHERE variety_id = ANY($1::int8[])",
    )
    .bind(variety_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert commitments whose `(variety_id, delivery_date)` is not yet present.
///
/// Existing rows are left untouched. Returns the number actually inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn insert_missing_commitments(
    pool: &PgPool,
    commitments: &[NewCommitment],
) -> Result<u64, DbError> {
    if commitments.is_empty() {
        return Ok(0);
    }

    let variety_ids: Vec<i64> = commitments.iter().map(|c| c.variety_id).collect();
    let dates: Vec<NaiveDate> = commitments.iter().map(|c| c.delivery_date).collect();
    let demand: Vec<i32> = commitments.iter().map(|c| c.demand_qty).collect();
    let captured: Vec<i32> = commitments.iter().map(|c| c.captured_qty).collect();
    let captors: Vec<&str> = commitments.iter().map(|c| c.captured_by.as_str()).collect();

    let result = sqlx::query(
        "INSERT INTO supply_commitments \
             (variety_id, delivery_date, demand_qty, captured_qty, captured_by) \
         SELECT * FROM UNNEST($1::int8[], $2::date[], $3::int4[], $4::int4[], $5::text[]) \
         ON CONFLICT (variety_id, delivery_date) DO NOTHING",
    )
    .bind(&variety_ids)
    .bind(&dates)
    .bind(&demand)
    .bind(&captured)
    .bind(&captors)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Record a manual capture for a variety and delivery date.
///
/// Creates the row (with zero demand) when missing; otherwise overwrites only
/// `captured_qty` and `captured_by`. Concurrent captures are last-write-wins.
///
/// # Errors
///
/// Returns [`DbError::Validation`] for a negative quantity or blank captor
/// (before any query runs), or [`DbError::Sqlx`] if the upsert fails,
/// including when `variety_id` does not exist.
pub async fn capture_commitment(
    pool: &PgPool,
    variety_id: i64,
    delivery_date: NaiveDate,
    captured_qty: i32,
    captured_by: &str,
) -> Result<CommitmentRow, DbError> {
    if captured_qty < 0 {
        return Err(DbError::Validation(format!(
            "captured quantity must not be negative (got {captured_qty})"
        )));
    }
    let captured_by = captured_by.trim();
    if captured_by.is_empty() {
        return Err(DbError::Validation("captured_by must not be empty".to_string()));
    }

    let row = sqlx::query_as::<_, CommitmentRow>(&format!(
        "INSERT INTO supply_commitments \
             (variety_id, delivery_date, demand_qty, captured_qty, captured_by) \
         VALUES ($1, $2, 0, $3, $4) \
         ON CONFLICT (variety_id, delivery_date) DO UPDATE SET \
             captured_qty = EXCLUDED.captured_qty, \
             captured_by  = EXCLUDED.captured_by, \
             updated_at   = NOW() \
         RETURNING {COMMITMENT_COLUMNS}"
    ))
    .bind(variety_id)
    .bind(delivery_date)
    .bind(captured_qty)
    .bind(captured_by)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches the commitment for one variety and date, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_commitment(
    pool: &PgPool,
    variety_id: i64,
    delivery_date: NaiveDate,
) -> Result<Option<CommitmentRow>, DbError> {
    let row = sqlx::query_as::<_, CommitmentRow>(&format!(
        "SELECT {COMMITMENT_COLUMNS} FROM supply_commitments \
         WHERE variety_id = $1 AND delivery_date = $2"
    ))
    .bind(variety_id)
    .bind(delivery_date)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Captured quantities for every variety on `delivery_date`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn commitments_for_date(
    pool: &PgPool,
    delivery_date: NaiveDate,
) -> Result<Vec<CommitmentSnapshot>, DbError> {
    let rows = sqlx::query_as::<_, (i64, i64, i32, Option<String>)>(
        "SELECT id, variety_id, captured_qty, captured_by \
         FROM supply_commitments \
         WHERE delivery_date = $1",
    )
    .bind(delivery_date)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(commitment_id, variety_id, captured_qty, captured_by)| CommitmentSnapshot {
                commitment_id,
                variety_id,
                captured_qty: i64::from(captured_qty),
                captured_by,
            },
        )
        .collect())
}
