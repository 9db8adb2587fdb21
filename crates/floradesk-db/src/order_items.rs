//! Database operations for `order_items`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// An item ready to insert, already resolved to local order and variety ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub variety_id: i64,
    pub quantity: i32,
    pub unit: String,
}

/// A row from the `order_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub variety_id: i64,
    pub quantity: i32,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

/// Delete every item belonging to any of `order_ids`.
///
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn delete_items_for_orders(pool: &PgPool, order_ids: &[i64]) -> Result<u64, DbError> {
    if order_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM order_items WHERE order_id = ANY($1::int8[])")
        .bind(order_ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Insert `items` in one statement. Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails; no row is inserted then.
pub async fn insert_order_items(pool: &PgPool, items: &[NewOrderItem]) -> Result<u64, DbError> {
    if items.is_empty() {
        return Ok(0);
    }

    let order_ids: Vec<i64> = items.iter().map(|i| i.order_id).collect();
    let variety_ids: Vec<i64> = items.iter().map(|i| i.variety_id).collect();
    let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
    let units: Vec<&str> = items.iter().map(|i| i.unit.as_str()).collect();

    let result = sqlx::query(
        "INSERT INTO order_items (order_id, variety_id, quantity, unit) \
         SELECT * FROM UNNEST($1::int8[], $2::int8[], $3::int4[], $4::text[])",
    )
    .bind(&order_ids)
    .bind(&variety_ids)
    .bind(&quantities)
    .bind(&units)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Items of one order, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_for_order(
    pool: &PgPool,
    order_id: i64,
) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, variety_id, quantity, unit, created_at \
         FROM order_items \
         WHERE order_id = $1 \
         ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
