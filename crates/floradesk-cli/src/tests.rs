use std::collections::BTreeMap;

use chrono::NaiveDate;
use floradesk_core::{DemandReport, DemandRow};
use floradesk_sync::{FetchWarning, PreparedSnapshot, SyncSummary};

use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["floradesk-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["floradesk-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["floradesk-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn sync_defaults_to_writing() {
    let cli = Cli::try_parse_from(["floradesk-cli", "sync"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Sync { dry_run: false })));
}

#[test]
fn sync_dry_run_flag() {
    let cli = Cli::try_parse_from(["floradesk-cli", "sync", "--dry-run"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Sync { dry_run: true })));
}

#[test]
fn demand_parses_date_window_and_grouping() {
    let cli = Cli::try_parse_from([
        "floradesk-cli",
        "demand",
        "--date",
        "2026-02-09",
        "--start",
        "12:00",
        "--end",
        "13:00",
        "--by-product",
    ])
    .unwrap();

    let Some(Commands::Demand {
        date,
        start,
        end,
        by_product,
        category,
    }) = cli.command
    else {
        panic!("expected demand command");
    };
    assert_eq!(date, NaiveDate::from_ymd_opt(2026, 2, 9).unwrap());
    assert_eq!(start.as_deref(), Some("12:00"));
    assert_eq!(end.as_deref(), Some("13:00"));
    assert!(by_product);
    assert!(category.is_none());
}

#[test]
fn demand_requires_date() {
    assert!(Cli::try_parse_from(["floradesk-cli", "demand"]).is_err());
}

#[test]
fn demand_rejects_malformed_date() {
    assert!(Cli::try_parse_from(["floradesk-cli", "demand", "--date", "09/02/2026"]).is_err());
}

#[test]
fn render_summary_lists_degradations() {
    let summary = SyncSummary {
        varieties_derived: 12,
        orders_synced: 4,
        items_inserted: 9,
        item_chunks_failed: 1,
        items_dropped: 2,
        fetch_warnings: vec![FetchWarning {
            resource: "collects".to_string(),
            error: "unexpected HTTP status 502".to_string(),
        }],
        ..SyncSummary::default()
    };

    let out = sync::render_summary(&summary);
    assert!(out.starts_with("Synced: 12 varieties, 4 orders\n"));
    assert!(out.contains("1 item chunk(s) failed"));
    assert!(out.contains("2 line item(s) had no matching variety"));
    assert!(out.contains("collects incomplete"));
    assert!(!out.contains("variety upsert failed"));
}

#[test]
fn render_dry_run_reports_counts() {
    let out = sync::render_dry_run(&PreparedSnapshot::default());
    assert_eq!(out, "dry-run: would sync 0 varieties, 0 orders, 0 line items\n");
}

#[test]
fn render_report_truncates_long_names() {
    let report = DemandReport {
        date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
        rows: vec![DemandRow {
            key: "1".to_string(),
            variety_ids: vec![1],
            name: "Rosa Ecuatoriana de Tallo Largo Extra Premium - Roja".to_string(),
            sku: Some("ROSA-ROJA".to_string()),
            image_url: None,
            category: "Rosas".to_string(),
            demand: 100,
            captured: 80,
            captured_by: Some("María".to_string()),
            commitment_id: Some(7),
            variance: -20,
            fulfillment_pct: 80,
            variants: BTreeMap::new(),
            orders: Vec::new(),
        }],
        total_demand: 100,
        distinct_clients: 2,
        active_orders: 3,
    };

    let out = demand::render_report(&report);
    assert!(out.contains("Rosa Ecuatoriana de Tallo Largo Ext..."));
    assert!(out.contains("-20"));
    assert!(out.ends_with("2026-02-09: 100 units, 2 clients, 3 orders\n"));
}
