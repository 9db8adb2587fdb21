//! `demand` command handler.

use chrono::NaiveDate;
use floradesk_core::{DemandQuery, DemandReport, Grouping, TimeWindow};

#[derive(Debug, Clone)]
pub(crate) struct DemandArgs {
    pub date: NaiveDate,
    pub start: Option<String>,
    pub end: Option<String>,
    pub by_product: bool,
    pub category: Option<String>,
}

impl DemandArgs {
    pub(crate) fn to_query(
        &self,
        config: &floradesk_core::AppConfig,
    ) -> anyhow::Result<DemandQuery> {
        let window = TimeWindow::parse(self.start.as_deref(), self.end.as_deref())?;
        Ok(DemandQuery {
            date: self.date,
            window,
            offset: config.demand_utc_offset,
            grouping: if self.by_product {
                Grouping::BaseProduct
            } else {
                Grouping::Variety
            },
            category: self.category.clone(),
        })
    }
}

/// Print the demand report for one delivery date.
///
/// # Errors
///
/// Returns an error for a malformed or inverted time window, or if the
/// database query fails.
pub(crate) async fn run_demand(
    pool: &sqlx::PgPool,
    config: &floradesk_core::AppConfig,
    args: DemandArgs,
) -> anyhow::Result<()> {
    let query = args.to_query(config)?;
    let report = floradesk_db::load_demand_report(pool, &query).await?;

    if report.rows.is_empty() {
        println!(
            "no demand for {} between {} and {}; run `sync` first",
            query.date,
            query.window.start().format("%H:%M"),
            query.window.end().format("%H:%M")
        );
        return Ok(());
    }

    print!("{}", render_report(&report));
    Ok(())
}

pub(crate) fn render_report(report: &DemandReport) -> String {
    let mut out = format!(
        "{:<40}{:<18}{:>8}{:>10}{:>10}{:>6}\n",
        "VARIETY", "CATEGORY", "DEMAND", "CAPTURED", "VARIANCE", "%"
    );
    for row in &report.rows {
        let name = if row.name.chars().count() > 38 {
            format!("{}...", row.name.chars().take(35).collect::<String>())
        } else {
            row.name.clone()
        };
        out.push_str(&format!(
            "{:<40}{:<18}{:>8}{:>10}{:>10}{:>6}\n",
            name, row.category, row.demand, row.captured, row.variance, row.fulfillment_pct
        ));
    }
    out.push_str(&format!(
        "\n{}: {} units, {} clients, {} orders\n",
        report.date, report.total_demand, report.distinct_clients, report.active_orders
    ));
    out
}
