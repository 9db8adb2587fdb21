//! Admin REST API record shapes, as returned inside each resource envelope.
//!
//! ## Observed quirks
//!
//! ### Empty strings
//! `sku`, `product_type`, and customer name fields come back as `""` as often
//! as `null`. The reconciler treats both as absent.
//!
//! ### `total_price`
//! A decimal string such as `"1250.00"`, never a JSON number.
//!
//! ### `current_quantity`
//! Present on line items from API version 2023-01 onward and reflects refunds
//! and order edits. Older payloads carry only `quantity`.
//!
//! ### `note_attributes`
//! Free-form `{name, value}` pairs typed in by staff or checkout apps. `value`
//! is usually a string but has been seen as `null`.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyImage {
    pub id: i64,
    pub src: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    pub id: i64,

    /// `"Default Title"` for single-variant products.
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub sku: Option<String>,

    /// Reference into the parent product's `images` list.
    #[serde(default)]
    pub image_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: i64,
    pub title: String,

    #[serde(default)]
    pub product_type: Option<String>,

    /// The product's featured image.
    #[serde(default)]
    pub image: Option<ShopifyImage>,

    #[serde(default)]
    pub images: Vec<ShopifyImage>,

    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
}

/// A custom or smart collection; both share this shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCollection {
    pub id: i64,
    pub title: String,
}

/// Membership link between a product and a custom collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCollect {
    pub product_id: i64,
    pub collection_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopifyCustomer {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopifyShippingAddress {
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyNoteAttribute {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl ShopifyNoteAttribute {
    /// The attribute value when it is a JSON string.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyLineItem {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub quantity: i64,
    #[serde(default)]
    pub current_quantity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrder {
    pub id: i64,

    /// Human order number such as `"#1042"`.
    pub name: String,

    pub created_at: DateTime<FixedOffset>,

    #[serde(default)]
    pub customer: Option<ShopifyCustomer>,

    #[serde(default)]
    pub shipping_address: Option<ShopifyShippingAddress>,

    #[serde(default)]
    pub total_price: Option<String>,

    #[serde(default)]
    pub note_attributes: Vec<ShopifyNoteAttribute>,

    #[serde(default)]
    pub line_items: Vec<ShopifyLineItem>,

    #[serde(default)]
    pub cancelled_at: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub fulfillment_status: Option<String>,
}
