//! Apply phase: write a prepared snapshot through a [`SyncStore`].
//!
//! Order of operations and which failures abort:
//!
//! 1. variety upsert (logged, pass continues)
//! 2. SKU index reload (fatal)
//! 3. order upsert (fatal)
//! 4. item delete for every touched order, all chunks (fatal on first failure)
//! 5. item insert per chunk (logged, chunk skipped)
//! 6. commitment backfill per chunk (logged, chunk skipped)

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use floradesk_core::ITEM_UNIT;
use floradesk_db::{NewCommitment, NewOrderItem, SavedOrder};

use crate::error::SyncError;
use crate::fetch::PreparedSnapshot;
use crate::store::SyncStore;
use crate::summary::SyncSummary;

/// Write `prepared` to `store`, rebuilding items for every touched order.
///
/// Re-running with the same snapshot converges to the same state: upserts are
/// keyed and items are deleted in full before any are inserted.
///
/// # Errors
///
/// Returns [`SyncError::VarietyIndex`], [`SyncError::OrderUpsert`], or
/// [`SyncError::ItemDelete`]. No item is inserted after a failed delete.
pub async fn apply_snapshot<S: SyncStore + ?Sized>(
    store: &S,
    prepared: &PreparedSnapshot,
    chunk_size: usize,
) -> Result<SyncSummary, SyncError> {
    let chunk_size = chunk_size.max(1);
    let mut summary = SyncSummary {
        varieties_derived: prepared.varieties.len(),
        fetch_warnings: prepared.fetch_warnings.clone(),
        ..SyncSummary::default()
    };

    if !prepared.varieties.is_empty() {
        if let Err(e) = store.upsert_varieties(&prepared.varieties).await {
            tracing::warn!(
                varieties = prepared.varieties.len(),
                error = %e,
                "variety upsert failed; resolving items against stored varieties"
            );
            summary.variety_upsert_failed = true;
        }
    }

    let sku_index = store
        .variety_sku_index()
        .await
        .map_err(SyncError::VarietyIndex)?;

    if prepared.orders.is_empty() {
        tracing::info!("no orders in snapshot; nothing to rebuild");
        return Ok(summary);
    }

    let new_orders: Vec<_> = prepared.orders.iter().map(|r| r.order.clone()).collect();
    let saved = store
        .upsert_orders(&new_orders)
        .await
        .map_err(SyncError::OrderUpsert)?;
    summary.orders_synced = saved.len();
    summary.rescheduled_orders = count_rescheduled(&saved);

    let saved_by_shopify_id: HashMap<i64, &SavedOrder> =
        saved.iter().map(|s| (s.shopify_id, s)).collect();

    let mut items: Vec<NewOrderItem> = Vec::with_capacity(prepared.line_count());
    let mut delivery_by_order: HashMap<i64, NaiveDate> = HashMap::with_capacity(saved.len());
    for reconciled in &prepared.orders {
        let Some(order) = saved_by_shopify_id.get(&reconciled.order.shopify_id) else {
            tracing::warn!(
                order = %reconciled.order.order_number,
                "order missing from upsert result; items skipped"
            );
            continue;
        };
        delivery_by_order.insert(order.id, order.delivery_date);

        for line in &reconciled.lines {
            match sku_index.get(&line.sku) {
                Some(&variety_id) => items.push(NewOrderItem {
                    order_id: order.id,
                    variety_id,
                    quantity: line.quantity,
                    unit: ITEM_UNIT.to_string(),
                }),
                None => {
                    tracing::warn!(
                        order = %reconciled.order.order_number,
                        sku = %line.sku,
                        "no variety for SKU; line dropped"
                    );
                    summary.items_dropped += 1;
                }
            }
        }
    }

    // Every touched order loses its items, including orders that now have none.
    let order_ids: Vec<i64> = saved.iter().map(|s| s.id).collect();
    for (chunk, ids) in order_ids.chunks(chunk_size).enumerate() {
        store
            .delete_items_for_orders(ids)
            .await
            .map_err(|source| SyncError::ItemDelete { chunk, source })?;
    }

    let mut demand_keys: BTreeSet<(i64, NaiveDate)> = BTreeSet::new();
    for (chunk, batch) in items.chunks(chunk_size).enumerate() {
        match store.insert_order_items(batch).await {
            Ok(inserted) => {
                summary.items_inserted += inserted;
                demand_keys.extend(batch.iter().filter_map(|item| {
                    delivery_by_order
                        .get(&item.order_id)
                        .map(|date| (item.variety_id, *date))
                }));
            }
            Err(e) => {
                tracing::warn!(
                    chunk,
                    items = batch.len(),
                    error = %e,
                    "item chunk insert failed; skipped"
                );
                summary.item_chunks_failed += 1;
            }
        }
    }

    backfill_commitments(store, &demand_keys, chunk_size, &mut summary).await;

    tracing::info!(
        varieties = summary.varieties_derived,
        orders = summary.orders_synced,
        items = summary.items_inserted,
        commitments = summary.commitments_created,
        degraded = summary.is_degraded(),
        "sync applied"
    );

    Ok(summary)
}

fn count_rescheduled(saved: &[SavedOrder]) -> usize {
    saved
        .iter()
        .filter(|order| {
            let moved = order.was_rescheduled();
            if moved {
                tracing::info!(
                    order_id = order.id,
                    shopify_id = order.shopify_id,
                    previous = ?order.previous_delivery_date,
                    current = %order.delivery_date,
                    "delivery date changed since last sync"
                );
            }
            moved
        })
        .count()
}

/// Insert a placeholder commitment for every (variety, date) pair that has
/// none yet. Existing commitments are never touched.
async fn backfill_commitments<S: SyncStore + ?Sized>(
    store: &S,
    demand_keys: &BTreeSet<(i64, NaiveDate)>,
    chunk_size: usize,
    summary: &mut SyncSummary,
) {
    if demand_keys.is_empty() {
        return;
    }

    let variety_ids: Vec<i64> = demand_keys
        .iter()
        .map(|(variety_id, _)| *variety_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut existing: BTreeSet<(i64, NaiveDate)> = BTreeSet::new();
    let mut unchecked: BTreeSet<i64> = BTreeSet::new();
    for (chunk, ids) in variety_ids.chunks(chunk_size).enumerate() {
        match store.commitment_keys_for_varieties(ids).await {
            Ok(keys) => existing.extend(keys),
            Err(e) => {
                tracing::warn!(
                    chunk,
                    varieties = ids.len(),
                    error = %e,
                    "commitment lookup failed; chunk skipped"
                );
                summary.commitment_failures += 1;
                unchecked.extend(ids.iter().copied());
            }
        }
    }

    let missing: Vec<NewCommitment> = demand_keys
        .iter()
        .filter(|key| !existing.contains(key) && !unchecked.contains(&key.0))
        .map(|&(variety_id, date)| NewCommitment::placeholder(variety_id, date))
        .collect();

    for (chunk, batch) in missing.chunks(chunk_size).enumerate() {
        match store.insert_missing_commitments(batch).await {
            Ok(created) => summary.commitments_created += created,
            Err(e) => {
                tracing::warn!(
                    chunk,
                    commitments = batch.len(),
                    error = %e,
                    "commitment insert failed; chunk skipped"
                );
                summary.commitment_failures += 1;
            }
        }
    }
}
