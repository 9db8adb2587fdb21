//! `sync` command handlers.

use chrono::Utc;
use floradesk_shopify::{ClientOptions, ShopifyClient};
use floradesk_sync::{
    fetch_snapshot, prepare_snapshot, run_recorded_sync, FetchWarning, PreparedSnapshot,
    SyncSettings, SyncSummary, TriggerSource,
};

/// Run a recorded sync pass and print its summary.
///
/// # Errors
///
/// Returns an error if Shopify is not configured or the pass aborts.
/// Degradations are printed, not returned.
pub(crate) async fn run_sync(
    pool: &sqlx::PgPool,
    config: &floradesk_core::AppConfig,
) -> anyhow::Result<()> {
    let summary = run_recorded_sync(pool, config, TriggerSource::Cli).await?;
    print!("{}", render_summary(&summary));
    Ok(())
}

/// Fetch and reconcile without a database; print what a pass would write.
///
/// # Errors
///
/// Returns an error if Shopify is not configured or the client cannot be
/// built.
pub(crate) async fn run_sync_dry_run(config: &floradesk_core::AppConfig) -> anyhow::Result<()> {
    let credentials = config.shopify_credentials()?;
    let client = ShopifyClient::new(&credentials, &ClientOptions::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build Shopify client: {e}"))?;

    let settings = SyncSettings::from_app_config(config);
    let snapshot = fetch_snapshot(&client, &settings, Utc::now()).await;
    let prepared = prepare_snapshot(snapshot);
    print!("{}", render_dry_run(&prepared));
    Ok(())
}

pub(crate) fn render_summary(summary: &SyncSummary) -> String {
    let mut out = format!("{}\n", summary.message());
    out.push_str(&format!(
        "items inserted: {}  rescheduled orders: {}  commitments created: {}\n",
        summary.items_inserted, summary.rescheduled_orders, summary.commitments_created
    ));
    if summary.variety_upsert_failed {
        out.push_str("warning: variety upsert failed; items resolved against stored varieties\n");
    }
    if summary.item_chunks_failed > 0 {
        out.push_str(&format!(
            "warning: {} item chunk(s) failed to insert\n",
            summary.item_chunks_failed
        ));
    }
    if summary.items_dropped > 0 {
        out.push_str(&format!(
            "warning: {} line item(s) had no matching variety\n",
            summary.items_dropped
        ));
    }
    if summary.commitment_failures > 0 {
        out.push_str(&format!(
            "warning: {} commitment chunk(s) failed\n",
            summary.commitment_failures
        ));
    }
    push_fetch_warnings(&mut out, &summary.fetch_warnings);
    out
}

pub(crate) fn render_dry_run(prepared: &PreparedSnapshot) -> String {
    let mut out = format!(
        "dry-run: would sync {} varieties, {} orders, {} line items\n",
        prepared.varieties.len(),
        prepared.orders.len(),
        prepared.line_count()
    );
    push_fetch_warnings(&mut out, &prepared.fetch_warnings);
    out
}

fn push_fetch_warnings(out: &mut String, warnings: &[FetchWarning]) {
    for warning in warnings {
        out.push_str(&format!(
            "warning: {} incomplete: {}\n",
            warning.resource, warning.error
        ));
    }
}
