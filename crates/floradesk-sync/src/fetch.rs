//! Fetch and reconcile phases. Neither touches storage.

use chrono::{DateTime, Duration, Utc};
use floradesk_core::{NewVariety, ReconciledOrder};
use floradesk_shopify::{
    build_category_index, extract_varieties, merge_orders, reconcile_order, Endpoint,
    FetchOutcome, ShopifyClient, ShopifyCollect, ShopifyCollection, ShopifyOrder, ShopifyProduct,
};

use crate::settings::SyncSettings;
use crate::summary::FetchWarning;

/// Raw records from one pass, with a warning for every resource whose walk
/// ended early. Orders are already merged by id.
#[derive(Debug, Default)]
pub struct ShopifySnapshot {
    pub products: Vec<ShopifyProduct>,
    pub custom_collections: Vec<ShopifyCollection>,
    pub smart_collections: Vec<ShopifyCollection>,
    pub collects: Vec<ShopifyCollect>,
    pub orders: Vec<ShopifyOrder>,
    pub warnings: Vec<FetchWarning>,
}

/// Normalized entities ready for the apply phase.
#[derive(Debug, Clone, Default)]
pub struct PreparedSnapshot {
    pub varieties: Vec<NewVariety>,
    pub orders: Vec<ReconciledOrder>,
    pub fetch_warnings: Vec<FetchWarning>,
}

impl PreparedSnapshot {
    /// Line items across all orders that survived reconciliation.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.orders.iter().map(|o| o.lines.len()).sum()
    }
}

/// Run the six resource walks concurrently.
///
/// Failures never abort: each resource keeps what it gathered and its error
/// becomes a [`FetchWarning`].
pub async fn fetch_snapshot(
    client: &ShopifyClient,
    settings: &SyncSettings,
    now: DateTime<Utc>,
) -> ShopifySnapshot {
    let since = now - Duration::days(i64::from(settings.lookback_days));

    let products_ep = Endpoint::products();
    let custom_ep = Endpoint::custom_collections();
    let smart_ep = Endpoint::smart_collections();
    let collects_ep = Endpoint::collects();
    let open_ep = Endpoint::open_orders();
    let recent_ep = Endpoint::orders_created_since(since);

    let (products, custom, smart, collects, open, recent) = tokio::join!(
        client.fetch_all::<ShopifyProduct>(&products_ep, settings.catalog_cap),
        client.fetch_all::<ShopifyCollection>(&custom_ep, settings.catalog_cap),
        client.fetch_all::<ShopifyCollection>(&smart_ep, settings.catalog_cap),
        client.fetch_all::<ShopifyCollect>(&collects_ep, settings.catalog_cap),
        client.fetch_all::<ShopifyOrder>(&open_ep, settings.open_orders_cap),
        client.fetch_all::<ShopifyOrder>(&recent_ep, settings.recent_orders_cap),
    );

    let mut warnings = Vec::new();
    let products = take(products, &products_ep, &mut warnings);
    let custom_collections = take(custom, &custom_ep, &mut warnings);
    let smart_collections = take(smart, &smart_ep, &mut warnings);
    let collects = take(collects, &collects_ep, &mut warnings);
    let open = take(open, &open_ep, &mut warnings);
    let recent = take(recent, &recent_ep, &mut warnings);

    tracing::info!(
        products = products.len(),
        collections = custom_collections.len() + smart_collections.len(),
        collects = collects.len(),
        open_orders = open.len(),
        recent_orders = recent.len(),
        "fetched shop snapshot"
    );

    ShopifySnapshot {
        products,
        custom_collections,
        smart_collections,
        collects,
        orders: merge_orders(open, recent),
        warnings,
    }
}

fn take<T>(
    outcome: FetchOutcome<T>,
    endpoint: &Endpoint,
    warnings: &mut Vec<FetchWarning>,
) -> Vec<T> {
    if let Some(error) = outcome.error {
        warnings.push(FetchWarning {
            resource: endpoint.label(),
            error: error.to_string(),
        });
    }
    outcome.items
}

/// Derive varieties and reconciled orders from a fetched snapshot.
#[must_use]
pub fn prepare_snapshot(snapshot: ShopifySnapshot) -> PreparedSnapshot {
    let categories = build_category_index(
        &snapshot.custom_collections,
        &snapshot.smart_collections,
        &snapshot.collects,
    );
    let varieties = extract_varieties(&snapshot.products, &categories);
    let orders = snapshot.orders.iter().map(reconcile_order).collect();

    PreparedSnapshot {
        varieties,
        orders,
        fetch_warnings: snapshot.warnings,
    }
}
