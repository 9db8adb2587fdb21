//! Read side of the demand aggregator.

use chrono::{DateTime, NaiveDate, Utc};
use floradesk_core::{aggregate_demand, DemandLine, DemandQuery, DemandReport};
use sqlx::PgPool;

use crate::commitments::commitments_for_date;
use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct DemandLineRow {
    variety_id: i64,
    variety_name: String,
    sku: String,
    image_url: Option<String>,
    category: Option<String>,
    quantity: i64,
    order_id: i64,
    order_number: String,
    client_name: String,
    location: String,
    is_vip: bool,
    order_created_at: DateTime<Utc>,
    delivery_date: NaiveDate,
}

impl From<DemandLineRow> for DemandLine {
    fn from(row: DemandLineRow) -> Self {
        Self {
            variety_id: row.variety_id,
            variety_name: row.variety_name,
            sku: row.sku,
            image_url: row.image_url,
            category: row.category,
            quantity: row.quantity,
            order_id: row.order_id,
            order_number: row.order_number,
            client_name: row.client_name,
            location: row.location,
            is_vip: row.is_vip,
            order_created_at: row.order_created_at,
            delivery_date: row.delivery_date,
        }
    }
}

/// Every order item delivered on `delivery_date`, joined with its variety
/// and order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn demand_lines_for_date(
    pool: &PgPool,
    delivery_date: NaiveDate,
) -> Result<Vec<DemandLine>, DbError> {
    let rows = sqlx::query_as::<_, DemandLineRow>(
        "SELECT v.id            AS variety_id, \
                v.name          AS variety_name, \
                v.sku, \
                v.image_url, \
                v.category, \
                oi.quantity::int8 AS quantity, \
                o.id            AS order_id, \
                o.order_number, \
                o.client_name, \
                o.location, \
                o.is_vip, \
                o.created_at    AS order_created_at, \
                o.delivery_date \
         FROM order_items oi \
         JOIN orders o    ON o.id = oi.order_id \
         JOIN varieties v ON v.id = oi.variety_id \
         WHERE o.delivery_date = $1 \
         ORDER BY o.created_at, oi.id",
    )
    .bind(delivery_date)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DemandLine::from).collect())
}

/// Load lines and commitments for `query.date` and fold them into a report.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either read fails.
pub async fn load_demand_report(
    pool: &PgPool,
    query: &DemandQuery,
) -> Result<DemandReport, DbError> {
    let lines = demand_lines_for_date(pool, query.date).await?;
    let commitments = commitments_for_date(pool, query.date).await?;
    Ok(aggregate_demand(query, &lines, &commitments))
}
