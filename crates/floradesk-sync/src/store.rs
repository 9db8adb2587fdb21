//! Storage seam for the apply phase.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use floradesk_core::{NewOrder, NewVariety};
use floradesk_db::{DbError, NewCommitment, NewOrderItem, SavedOrder};
use sqlx::PgPool;

/// One method per storage operation the apply phase performs. Each call is a
/// single statement; nothing spans calls.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Upsert keyed on SKU. Returns the number of rows written.
    async fn upsert_varieties(&self, varieties: &[NewVariety]) -> Result<u64, DbError>;

    /// SKU → variety id for every stored variety.
    async fn variety_sku_index(&self) -> Result<HashMap<String, i64>, DbError>;

    /// Upsert keyed on Shopify id, reporting each order's prior delivery date.
    async fn upsert_orders(&self, orders: &[NewOrder]) -> Result<Vec<SavedOrder>, DbError>;

    async fn delete_items_for_orders(&self, order_ids: &[i64]) -> Result<u64, DbError>;

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<u64, DbError>;

    async fn commitment_keys_for_varieties(
        &self,
        variety_ids: &[i64],
    ) -> Result<Vec<(i64, NaiveDate)>, DbError>;

    /// Insert only pairs not yet present. Returns the number inserted.
    async fn insert_missing_commitments(
        &self,
        commitments: &[NewCommitment],
    ) -> Result<u64, DbError>;
}

/// [`SyncStore`] over the floradesk Postgres schema.
#[derive(Debug, Clone)]
pub struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn upsert_varieties(&self, varieties: &[NewVariety]) -> Result<u64, DbError> {
        let (inserted, updated) = floradesk_db::upsert_varieties(&self.pool, varieties).await?;
        Ok(inserted + updated)
    }

    async fn variety_sku_index(&self) -> Result<HashMap<String, i64>, DbError> {
        floradesk_db::variety_sku_index(&self.pool).await
    }

    async fn upsert_orders(&self, orders: &[NewOrder]) -> Result<Vec<SavedOrder>, DbError> {
        floradesk_db::upsert_orders(&self.pool, orders).await
    }

    async fn delete_items_for_orders(&self, order_ids: &[i64]) -> Result<u64, DbError> {
        floradesk_db::delete_items_for_orders(&self.pool, order_ids).await
    }

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<u64, DbError> {
        floradesk_db::insert_order_items(&self.pool, items).await
    }

    async fn commitment_keys_for_varieties(
        &self,
        variety_ids: &[i64],
    ) -> Result<Vec<(i64, NaiveDate)>, DbError> {
        floradesk_db::commitment_keys_for_varieties(&self.pool, variety_ids).await
    }

    async fn insert_missing_commitments(
        &self,
        commitments: &[NewCommitment],
    ) -> Result<u64, DbError> {
        floradesk_db::insert_missing_commitments(&self.pool, commitments).await
    }
}
