//! Conversion from Admin API records to normalized floradesk entities.
//!
//! Every function here is pure. Indices are built per call and never cached
//! across passes.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use floradesk_core::{NewOrder, NewVariety, OrderLine, OrderStatus, ReconciledOrder};
use rust_decimal::Decimal;

use crate::types::{
    ShopifyCollect, ShopifyCollection, ShopifyLineItem, ShopifyNoteAttribute, ShopifyOrder,
    ShopifyProduct, ShopifyVariant,
};

/// Category for products in no collection and without a product type.
pub const UNCOLLECTED: &str = "Sin Colección";

/// Client name when the order has no customer name.
pub const FALLBACK_CLIENT: &str = "Cliente Shopify";

/// Location when the order has no shipping city.
pub const FALLBACK_LOCATION: &str = "En línea";

/// Variant title Shopify assigns to single-variant products.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

/// Orders strictly above this total are flagged VIP.
pub const VIP_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Note-attribute names that may carry the delivery date, highest priority first.
const DELIVERY_ATTRIBUTE_NAMES: [&str; 4] = [
    "fecha de recolección",
    "delivery date",
    "delivery_date",
    "fecha de entrega",
];

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Product id → title of the first collection it belongs to.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    by_product: HashMap<i64, String>,
}

impl CategoryIndex {
    #[must_use]
    pub fn get(&self, product_id: i64) -> Option<&str> {
        self.by_product.get(&product_id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_product.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_product.is_empty()
    }
}

/// Index collection membership. The first collect (in the given order) that
/// names a known collection decides a product's category.
#[must_use]
pub fn build_category_index(
    custom: &[ShopifyCollection],
    smart: &[ShopifyCollection],
    collects: &[ShopifyCollect],
) -> CategoryIndex {
    let titles: HashMap<i64, &str> = custom
        .iter()
        .chain(smart)
        .map(|c| (c.id, c.title.as_str()))
        .collect();

    let mut by_product = HashMap::new();
    for collect in collects {
        if let Some(title) = titles.get(&collect.collection_id) {
            by_product
                .entry(collect.product_id)
                .or_insert_with(|| (*title).to_string());
        }
    }

    CategoryIndex { by_product }
}

fn resolve_category(product: &ShopifyProduct, categories: &CategoryIndex) -> String {
    categories
        .get(product.id)
        .map(str::to_string)
        .or_else(|| non_blank(product.product_type.as_deref()).map(str::to_string))
        .unwrap_or_else(|| UNCOLLECTED.to_string())
}

// ---------------------------------------------------------------------------
// Varieties
// ---------------------------------------------------------------------------

/// SKU assigned to a variant without one of its own.
#[must_use]
pub fn fallback_variant_sku(product_id: i64, variant_id: i64) -> String {
    format!("SHOPIFY-{product_id}-{variant_id}")
}

/// SKU assigned to a product that has no variants at all.
#[must_use]
pub fn fallback_product_sku(product_id: i64) -> String {
    format!("SHOPIFY-{product_id}")
}

/// One variety per variant; a product without variants yields a single
/// product-level variety.
#[must_use]
pub fn extract_varieties(
    products: &[ShopifyProduct],
    categories: &CategoryIndex,
) -> Vec<NewVariety> {
    let mut varieties = Vec::new();

    for product in products {
        let category = resolve_category(product, categories);
        let product_image = product.image.as_ref().map(|img| img.src.clone());

        if product.variants.is_empty() {
            varieties.push(NewVariety {
                name: product.title.clone(),
                sku: fallback_product_sku(product.id),
                image_url: product_image,
                category,
            });
            continue;
        }

        for variant in &product.variants {
            varieties.push(NewVariety {
                name: variety_name(&product.title, variant),
                sku: non_blank(variant.sku.as_deref())
                    .map_or_else(|| fallback_variant_sku(product.id, variant.id), str::to_string),
                image_url: variant_image(product, variant).or_else(|| product_image.clone()),
                category: category.clone(),
            });
        }
    }

    varieties
}

fn variety_name(product_title: &str, variant: &ShopifyVariant) -> String {
    match non_blank(variant.title.as_deref()) {
        Some(title) if title != DEFAULT_VARIANT_TITLE => format!("{product_title} - {title}"),
        _ => product_title.to_string(),
    }
}

fn variant_image(product: &ShopifyProduct, variant: &ShopifyVariant) -> Option<String> {
    let image_id = variant.image_id?;
    product
        .images
        .iter()
        .find(|img| img.id == image_id)
        .map(|img| img.src.clone())
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Combine the open-order and recent-order queries by order id.
///
/// An order keeps the position of its first appearance; when both queries
/// return it, the record from `recent` wins.
#[must_use]
pub fn merge_orders(open: Vec<ShopifyOrder>, recent: Vec<ShopifyOrder>) -> Vec<ShopifyOrder> {
    let mut position: HashMap<i64, usize> = HashMap::with_capacity(open.len() + recent.len());
    let mut merged: Vec<ShopifyOrder> = Vec::with_capacity(open.len() + recent.len());

    for order in open.into_iter().chain(recent) {
        match position.get(&order.id) {
            Some(&idx) => merged[idx] = order,
            None => {
                position.insert(order.id, merged.len());
                merged.push(order);
            }
        }
    }

    merged
}

/// Normalize one order and its line items.
///
/// Line items with an effective quantity of zero or less are dropped, as are
/// items that carry neither a SKU nor a product id.
#[must_use]
pub fn reconcile_order(order: &ShopifyOrder) -> ReconciledOrder {
    let lines = order
        .line_items
        .iter()
        .filter_map(|item| reconcile_line(&order.name, item))
        .collect();

    ReconciledOrder {
        order: NewOrder {
            shopify_id: order.id,
            order_number: order.name.clone(),
            client_name: client_name(order),
            location: order
                .shipping_address
                .as_ref()
                .and_then(|a| non_blank(a.city.as_deref()))
                .unwrap_or(FALLBACK_LOCATION)
                .to_string(),
            status: derive_status(order),
            is_vip: is_vip(order.total_price.as_deref()),
            created_at: order.created_at.with_timezone(&Utc),
            delivery_date: parse_delivery_date(&order.note_attributes, order.created_at),
        },
        lines,
    }
}

fn reconcile_line(order_name: &str, item: &ShopifyLineItem) -> Option<OrderLine> {
    let quantity = effective_quantity(item);
    if quantity <= 0 {
        return None;
    }
    let Ok(quantity) = i32::try_from(quantity) else {
        tracing::warn!(order = %order_name, quantity, "line item quantity out of range; dropped");
        return None;
    };
    let Some(sku) = line_sku(item) else {
        tracing::warn!(order = %order_name, "line item has neither SKU nor product id; dropped");
        return None;
    };
    Some(OrderLine { sku, quantity })
}

/// Quantity after refunds and edits, falling back to the nominal quantity.
#[must_use]
pub fn effective_quantity(item: &ShopifyLineItem) -> i64 {
    item.current_quantity.unwrap_or(item.quantity)
}

/// Resolve a line item to the SKU its variety was stored under.
#[must_use]
pub fn line_sku(item: &ShopifyLineItem) -> Option<String> {
    if let Some(sku) = non_blank(item.sku.as_deref()) {
        return Some(sku.to_string());
    }
    match (item.product_id, item.variant_id) {
        (Some(product_id), Some(variant_id)) => Some(fallback_variant_sku(product_id, variant_id)),
        (Some(product_id), None) => Some(fallback_product_sku(product_id)),
        (None, _) => None,
    }
}

fn client_name(order: &ShopifyOrder) -> String {
    let joined = order
        .customer
        .as_ref()
        .map(|c| {
            format!(
                "{} {}",
                c.first_name.as_deref().unwrap_or_default(),
                c.last_name.as_deref().unwrap_or_default()
            )
        })
        .unwrap_or_default();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        FALLBACK_CLIENT.to_string()
    } else {
        trimmed.to_string()
    }
}

fn derive_status(order: &ShopifyOrder) -> OrderStatus {
    if order.cancelled_at.is_some() {
        OrderStatus::Cancelled
    } else if order.fulfillment_status.as_deref() == Some("fulfilled") {
        OrderStatus::Fulfilled
    } else {
        OrderStatus::Pending
    }
}

fn is_vip(total_price: Option<&str>) -> bool {
    total_price
        .and_then(|raw| Decimal::from_str(raw.trim()).ok())
        .is_some_and(|total| total > VIP_THRESHOLD)
}

// ---------------------------------------------------------------------------
// Delivery date
// ---------------------------------------------------------------------------

/// Derive an order's delivery date from its note attributes.
///
/// The highest-priority attribute present decides: its value is read as
/// `DD/MM/YYYY`, then as a `YYYY-MM-DD` prefix. When no attribute is present
/// or its value does not parse, the creation date (in the creation
/// timestamp's own offset) is used.
#[must_use]
pub fn parse_delivery_date(
    attributes: &[ShopifyNoteAttribute],
    created_at: DateTime<FixedOffset>,
) -> NaiveDate {
    find_delivery_attribute(attributes)
        .and_then(ShopifyNoteAttribute::value_str)
        .and_then(|value| parse_day_month_year(value).or_else(|| parse_iso_prefix(value)))
        .unwrap_or_else(|| created_at.date_naive())
}

fn find_delivery_attribute(
    attributes: &[ShopifyNoteAttribute],
) -> Option<&ShopifyNoteAttribute> {
    DELIVERY_ATTRIBUTE_NAMES.iter().find_map(|wanted| {
        attributes
            .iter()
            .find(|attr| attr.name.trim().to_lowercase() == *wanted)
    })
}

fn parse_day_month_year(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(
        year.trim().parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )
}

fn parse_iso_prefix(value: &str) -> Option<NaiveDate> {
    let prefix = value.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
