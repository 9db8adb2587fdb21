//! Database operations for `orders`.

use chrono::{DateTime, NaiveDate, Utc};
use floradesk_core::NewOrder;
use sqlx::PgPool;

use crate::varieties::last_per_key;
use crate::DbError;

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub shopify_id: i64,
    pub order_number: String,
    pub client_name: String,
    pub location: String,
    pub status: String,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
    pub delivery_date: NaiveDate,
    pub synced_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Local identity of an upserted order.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SavedOrder {
    pub id: i64,
    pub shopify_id: i64,
    pub delivery_date: NaiveDate,
    /// `None` for orders seen for the first time.
    pub previous_delivery_date: Option<NaiveDate>,
}

impl SavedOrder {
    #[must_use]
    pub fn was_rescheduled(&self) -> bool {
        self.previous_delivery_date
            .is_some_and(|previous| previous != self.delivery_date)
    }
}

/// Upsert orders keyed on `shopify_id` and return each order's local id,
/// current delivery date, and the delivery date it had before this call.
///
/// All CTEs share one snapshot, so `previous` sees the rows as they were
/// before the upsert.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_orders(
    pool: &PgPool,
    orders: &[NewOrder],
) -> Result<Vec<SavedOrder>, DbError> {
    let orders = last_per_key(orders, |o| o.shopify_id);
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let mut shopify_ids: Vec<i64> = Vec::with_capacity(orders.len());
    let mut order_numbers: Vec<&str> = Vec::with_capacity(orders.len());
    let mut client_names: Vec<&str> = Vec::with_capacity(orders.len());
    let mut locations: Vec<&str> = Vec::with_capacity(orders.len());
    let mut statuses: Vec<&str> = Vec::with_capacity(orders.len());
    let mut vips: Vec<bool> = Vec::with_capacity(orders.len());
    let mut created: Vec<DateTime<Utc>> = Vec::with_capacity(orders.len());
    let mut delivery_dates: Vec<NaiveDate> = Vec::with_capacity(orders.len());

    for order in &orders {
        shopify_ids.push(order.shopify_id);
        order_numbers.push(&order.order_number);
        client_names.push(&order.client_name);
        locations.push(&order.location);
        statuses.push(order.status.as_str());
        vips.push(order.is_vip);
        created.push(order.created_at);
        delivery_dates.push(order.delivery_date);
    }

    let saved = sqlx::query_as::<_, SavedOrder>(
        "WITH input AS ( \
             SELECT * FROM UNNEST( \
                 $1::int8[], $2::text[], $3::text[], $4::text[], $5::text[], \
                 $6::bool[], $7::timestamptz[], $8::date[]) \
             AS t(shopify_id, order_number, client_name, location, status, \
                  is_vip, created_at, delivery_date) \
         ), \
         previous AS ( \
             SELECT o.shopify_id, o.delivery_date \
             FROM orders o \
             JOIN input i ON i.shopify_id = o.shopify_id \
         ), \
         upserted AS ( \
             INSERT INTO orders \
                 (shopify_id, order_number, client_name, location, status, \
                  is_vip, created_at, delivery_date) \
             SELECT shopify_id, order_number, client_name, location, status, \
                    is_vip, created_at, delivery_date \
             FROM input \
             ON CONFLICT (shopify_id) DO UPDATE SET \
                 order_number  = EXCLUDED.order_number, \
                 client_name   = EXCLUDED.client_name, \
                 location      = EXCLUDED.location, \
                 status        = EXCLUDED.status, \
                 is_vip        = EXCLUDED.is_vip, \
                 created_at    = EXCLUDED.created_at, \
                 delivery_date = EXCLUDED.delivery_date, \
                 synced_at     = NOW(), \
                 updated_at    = NOW() \
             RETURNING id, shopify_id, delivery_date \
         ) \
         SELECT u.id, u.shopify_id, u.delivery_date, \
                p.delivery_date AS previous_delivery_date \
         FROM upserted u \
         LEFT JOIN previous p ON p.shopify_id = u.shopify_id \
         ORDER BY u.id",
    )
    .bind(&shopify_ids)
    .bind(&order_numbers)
    .bind(&client_names)
    .bind(&locations)
    .bind(&statuses)
    .bind(&vips)
    .bind(&created)
    .bind(&delivery_dates)
    .fetch_all(pool)
    .await?;

    Ok(saved)
}

/// Fetches an order by its Shopify id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such order exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_order_by_shopify_id(
    pool: &PgPool,
    shopify_id: i64,
) -> Result<OrderRow, DbError> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT id, shopify_id, order_number, client_name, location, status, is_vip, \
                created_at, delivery_date, synced_at, updated_at \
         FROM orders \
         WHERE shopify_id = $1",
    )
    .bind(shopify_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
