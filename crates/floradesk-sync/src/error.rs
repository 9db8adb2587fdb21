use floradesk_core::ConfigError;
use floradesk_db::DbError;
use floradesk_shopify::ShopifyError;
use thiserror::Error;

/// Failures that abort a sync pass. Everything else is logged and counted in
/// the summary.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Shopify is not configured: {0}")]
    MissingCredentials(#[from] ConfigError),

    #[error("failed to build Shopify client: {0}")]
    Client(#[source] ShopifyError),

    #[error("failed to load variety lookup: {0}")]
    VarietyIndex(#[source] DbError),

    #[error("failed to upsert orders: {0}")]
    OrderUpsert(#[source] DbError),

    #[error("failed to delete items for order chunk {chunk}: {source}")]
    ItemDelete {
        chunk: usize,
        #[source]
        source: DbError,
    },
}

impl SyncError {
    /// True for failures caused by configuration rather than the pass itself.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, SyncError::MissingCredentials(_))
    }
}
