//! Entry points used by the server, scheduler, and CLI.

use chrono::Utc;
use floradesk_core::{AppConfig, ShopifyCredentials};
use floradesk_db::SyncRunCounts;
use floradesk_shopify::{ClientOptions, ShopifyClient};
use sqlx::PgPool;

use crate::apply::apply_snapshot;
use crate::error::SyncError;
use crate::fetch::{fetch_snapshot, prepare_snapshot};
use crate::settings::SyncSettings;
use crate::store::{PgSyncStore, SyncStore};
use crate::summary::SyncSummary;

/// What started a recorded pass; stored in `sync_runs.trigger_source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Api,
    Scheduler,
    Cli,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Api => "api",
            TriggerSource::Scheduler => "scheduler",
            TriggerSource::Cli => "cli",
        }
    }
}

/// Fetch, reconcile, and apply with an already-built client.
///
/// # Errors
///
/// Returns any fatal [`SyncError`] from the apply phase.
pub async fn sync_with_client<S: SyncStore + ?Sized>(
    client: &ShopifyClient,
    store: &S,
    settings: &SyncSettings,
) -> Result<SyncSummary, SyncError> {
    let snapshot = fetch_snapshot(client, settings, Utc::now()).await;
    let prepared = prepare_snapshot(snapshot);
    apply_snapshot(store, &prepared, settings.chunk_size).await
}

/// One full pass against the configured shop.
///
/// Credentials are resolved before any request is made.
///
/// # Errors
///
/// Returns [`SyncError::MissingCredentials`] when the shop domain or token is
/// unset, [`SyncError::Client`] if the client cannot be built, or any fatal
/// apply-phase error.
pub async fn run_sync(pool: &PgPool, config: &AppConfig) -> Result<SyncSummary, SyncError> {
    let credentials = config.shopify_credentials()?;
    run_sync_with_credentials(pool, config, &credentials).await
}

async fn run_sync_with_credentials(
    pool: &PgPool,
    config: &AppConfig,
    credentials: &ShopifyCredentials,
) -> Result<SyncSummary, SyncError> {
    let client = ShopifyClient::new(credentials, &ClientOptions::from_app_config(config))
        .map_err(SyncError::Client)?;
    let store = PgSyncStore::new(pool.clone());
    sync_with_client(&client, &store, &SyncSettings::from_app_config(config)).await
}

/// [`run_sync`] bracketed by a `sync_runs` record.
///
/// Missing credentials fail before a run row is written. Bookkeeping
/// failures are logged and never change the pass result.
///
/// # Errors
///
/// Same as [`run_sync`].
pub async fn run_recorded_sync(
    pool: &PgPool,
    config: &AppConfig,
    trigger: TriggerSource,
) -> Result<SyncSummary, SyncError> {
    let credentials = config.shopify_credentials()?;

    let run_id = match floradesk_db::create_sync_run(pool, trigger.as_str()).await {
        Ok(run) => match floradesk_db::start_sync_run(pool, run.id).await {
            Ok(()) => Some(run.id),
            Err(e) => {
                tracing::warn!(run_id = run.id, error = %e, "failed to mark sync run running");
                None
            }
        },
        Err(e) => {
            tracing::warn!(trigger = trigger.as_str(), error = %e, "failed to record sync run");
            None
        }
    };

    let result = run_sync_with_credentials(pool, config, &credentials).await;

    let Some(run_id) = run_id else {
        return result;
    };

    match &result {
        Ok(summary) => {
            if let Err(e) = floradesk_db::complete_sync_run(pool, run_id, run_counts(summary)).await
            {
                tracing::warn!(run_id, error = %e, "failed to mark sync run succeeded");
            }
        }
        Err(err) => {
            if let Err(e) = floradesk_db::fail_sync_run(pool, run_id, &err.to_string()).await {
                tracing::warn!(run_id, error = %e, "failed to mark sync run failed");
            }
        }
    }

    result
}

fn run_counts(summary: &SyncSummary) -> SyncRunCounts {
    SyncRunCounts {
        varieties_synced: saturating_i32(summary.varieties_derived),
        orders_synced: saturating_i32(summary.orders_synced),
        items_inserted: i32::try_from(summary.items_inserted).unwrap_or(i32::MAX),
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_sources_match_stored_values() {
        assert_eq!(TriggerSource::Api.as_str(), "api");
        assert_eq!(TriggerSource::Scheduler.as_str(), "scheduler");
        assert_eq!(TriggerSource::Cli.as_str(), "cli");
    }

    #[test]
    fn run_counts_saturate() {
        let summary = SyncSummary {
            varieties_derived: usize::MAX,
            orders_synced: 3,
            items_inserted: u64::MAX,
            ..SyncSummary::default()
        };
        let counts = run_counts(&summary);
        assert_eq!(counts.varieties_synced, i32::MAX);
        assert_eq!(counts.orders_synced, 3);
        assert_eq!(counts.items_inserted, i32::MAX);
    }
}
