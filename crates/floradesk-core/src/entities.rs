//! Normalized entities produced by the reconciler and written by the sync.
//!
//! Raw Admin API records never cross this boundary; everything downstream of
//! the reconciler works with these types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unit recorded on every synced order item.
pub const ITEM_UNIT: &str = "unidades";

/// A sellable SKU-level variant, keyed on `sku` for upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariety {
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub category: String,
}

/// Lifecycle state of a mirrored order, derived on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order mirrored from the shop, keyed on `shopify_id` for upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub shopify_id: i64,
    pub order_number: String,
    pub client_name: String,
    pub location: String,
    pub status: OrderStatus,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
    pub delivery_date: NaiveDate,
}

/// One line of an order, resolved to a variety SKU with a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,
    pub quantity: i32,
}

/// An order plus the lines that survived effective-quantity filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledOrder {
    pub order: NewOrder,
    pub lines: Vec<OrderLine>,
}
