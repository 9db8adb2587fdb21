//! Brings local varieties, orders, items, and commitments in line with the
//! shop.
//!
//! A pass runs fetch → reconcile → apply. Apply talks to storage only through
//! [`SyncStore`], so every phase's failure handling can be exercised without
//! Postgres.

mod apply;
mod error;
mod fetch;
mod guard;
mod runs;
mod settings;
mod store;
mod summary;

pub use apply::apply_snapshot;
pub use error::SyncError;
pub use fetch::{fetch_snapshot, prepare_snapshot, PreparedSnapshot, ShopifySnapshot};
pub use guard::{SyncGuard, SyncPermit};
pub use runs::{run_recorded_sync, run_sync, sync_with_client, TriggerSource};
pub use settings::SyncSettings;
pub use store::{PgSyncStore, SyncStore};
pub use summary::{FetchWarning, SyncSummary};
