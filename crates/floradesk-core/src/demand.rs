//! Per-variety daily demand, folded from flattened order-line rows.
//!
//! The read side fetches [`DemandLine`]s and [`CommitmentSnapshot`]s; every
//! filter and grouping decision happens here so it can be tested without a
//! database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category shown for varieties without one.
pub const UNCATEGORIZED: &str = "Sin Categoría";

/// Variant label for names without a recognized tier suffix.
pub const NO_VARIANT: &str = "Sin Variante";

static VARIANT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i) - (Estándar|Standard|Primera|Premium|Default Title)$").expect("valid regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DemandError {
    #[error("invalid time of day {0:?}; expected HH:MM")]
    InvalidTime(String),

    #[error("window start {start} is after end {end}")]
    InvertedWindow { start: String, end: String },
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Inclusive creation-time-of-day window at minute granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    /// `00:00` through `23:59`.
    #[must_use]
    pub fn all_day() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// Build a window from optional `HH:MM` bounds; missing bounds fall back
    /// to the start or end of the day.
    ///
    /// # Errors
    ///
    /// Returns [`DemandError::InvalidTime`] for malformed bounds and
    /// [`DemandError::InvertedWindow`] when `start` is after `end`.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DemandError> {
        let day = Self::all_day();
        let start = start.map(parse_hh_mm).transpose()?.unwrap_or(day.start);
        let end = end.map(parse_hh_mm).transpose()?.unwrap_or(day.end);
        if start > end {
            return Err(DemandError::InvertedWindow {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Seconds are ignored: 12:00:59 sits inside a window ending at 12:00.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        self.start <= minute && minute <= self.end
    }

    #[must_use]
    pub fn start(&self) -> NaiveTime {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveTime {
        self.end
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::all_day()
    }
}

fn parse_hh_mm(raw: &str) -> Result<NaiveTime, DemandError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| DemandError::InvalidTime(raw.to_string()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    #[default]
    Variety,
    BaseProduct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandQuery {
    pub date: NaiveDate,
    pub window: TimeWindow,
    /// Local zone in which the window is evaluated.
    pub offset: FixedOffset,
    pub grouping: Grouping,
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One order item joined with its variety and parent order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandLine {
    pub variety_id: i64,
    pub variety_name: String,
    pub sku: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub order_id: i64,
    pub order_number: String,
    pub client_name: String,
    pub location: String,
    pub is_vip: bool,
    pub order_created_at: DateTime<Utc>,
    pub delivery_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentSnapshot {
    pub commitment_id: i64,
    pub variety_id: i64,
    pub captured_qty: i64,
    pub captured_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderContribution {
    pub order_id: i64,
    pub order_number: String,
    pub client_name: String,
    pub location: String,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
    pub quantity: i64,
    pub variant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandRow {
    /// Variety id for per-variety rows, base product name otherwise.
    pub key: String,
    pub variety_ids: Vec<i64>,
    pub name: String,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub category: String,
    pub demand: i64,
    pub captured: i64,
    /// Set only for rows backed by a single variety.
    pub captured_by: Option<String>,
    /// Set only for rows backed by a single variety.
    pub commitment_id: Option<i64>,
    pub variance: i64,
    pub fulfillment_pct: i64,
    pub variants: BTreeMap<String, i64>,
    pub orders: Vec<OrderContribution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandReport {
    pub date: NaiveDate,
    pub rows: Vec<DemandRow>,
    pub total_demand: i64,
    pub distinct_clients: usize,
    pub active_orders: usize,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Fold order lines into demand rows for `query.date`.
///
/// Lines are kept when their order's delivery date equals the target date
/// and the order's creation instant, shifted into `query.offset`, falls in
/// the window. Rows with zero matching demand are never emitted, even when a
/// commitment exists for them.
#[must_use]
pub fn aggregate_demand(
    query: &DemandQuery,
    lines: &[DemandLine],
    commitments: &[CommitmentSnapshot],
) -> DemandReport {
    let by_variety: HashMap<i64, &CommitmentSnapshot> =
        commitments.iter().map(|c| (c.variety_id, c)).collect();

    let mut rows: Vec<DemandRow> = Vec::new();
    let mut row_index: HashMap<String, usize> = HashMap::new();
    let mut clients: HashSet<&str> = HashSet::new();
    let mut orders: HashSet<i64> = HashSet::new();

    for line in lines.iter().filter(|l| line_matches(query, l)) {
        let category = line
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        if let Some(wanted) = &query.category {
            if *wanted != category {
                continue;
            }
        }

        let (key, name) = match query.grouping {
            Grouping::Variety => (line.variety_id.to_string(), line.variety_name.clone()),
            Grouping::BaseProduct => {
                let base = base_product_name(&line.variety_name).to_string();
                (base.clone(), base)
            }
        };

        let idx = *row_index.entry(key.clone()).or_insert_with(|| {
            rows.push(DemandRow {
                key,
                variety_ids: Vec::new(),
                name,
                sku: Some(line.sku.clone()),
                image_url: line.image_url.clone(),
                category,
                demand: 0,
                captured: 0,
                captured_by: None,
                commitment_id: None,
                variance: 0,
                fulfillment_pct: 0,
                variants: BTreeMap::new(),
                orders: Vec::new(),
            });
            rows.len() - 1
        });
        let row = &mut rows[idx];

        if !row.variety_ids.contains(&line.variety_id) {
            row.variety_ids.push(line.variety_id);
        }
        let variant = variant_label(&line.variety_name).to_string();
        row.demand += line.quantity;
        *row.variants.entry(variant.clone()).or_insert(0) += line.quantity;
        row.orders.push(OrderContribution {
            order_id: line.order_id,
            order_number: line.order_number.clone(),
            client_name: line.client_name.clone(),
            location: line.location.clone(),
            is_vip: line.is_vip,
            created_at: line.order_created_at,
            quantity: line.quantity,
            variant,
        });

        clients.insert(line.client_name.as_str());
        orders.insert(line.order_id);
    }

    rows.retain(|row| row.demand > 0);

    for row in &mut rows {
        row.captured = row
            .variety_ids
            .iter()
            .filter_map(|id| by_variety.get(id))
            .map(|c| c.captured_qty)
            .sum();
        if let [only] = row.variety_ids.as_slice() {
            if let Some(commitment) = by_variety.get(only) {
                row.commitment_id = Some(commitment.commitment_id);
                row.captured_by.clone_from(&commitment.captured_by);
            }
        } else {
            row.sku = None;
        }
        row.variance = row.captured - row.demand;
        row.fulfillment_pct = fulfillment_pct(row.captured, row.demand);
    }

    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key.cmp(&b.key)));

    DemandReport {
        date: query.date,
        total_demand: rows.iter().map(|r| r.demand).sum(),
        distinct_clients: clients.len(),
        active_orders: orders.len(),
        rows,
    }
}

fn line_matches(query: &DemandQuery, line: &DemandLine) -> bool {
    line.delivery_date == query.date
        && query
            .window
            .contains(local_time_of_day(line.order_created_at, query.offset))
}

/// Wall-clock time of `instant` in the fixed zone `offset`.
#[must_use]
pub fn local_time_of_day(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveTime {
    instant.with_timezone(&offset).time()
}

/// Captured as a whole-number percentage of demand, rounded half up.
/// Zero demand yields zero.
#[must_use]
pub fn fulfillment_pct(captured: i64, demand: i64) -> i64 {
    if demand <= 0 {
        return 0;
    }
    let scaled = captured * 100;
    // Half-up rounding for non-negative ratios via (2x + d) / 2d.
    if scaled >= 0 {
        (2 * scaled + demand) / (2 * demand)
    } else {
        -((-2 * scaled + demand - 1) / (2 * demand))
    }
}

/// Strip a trailing tier suffix such as ` - Premium`.
#[must_use]
pub fn base_product_name(name: &str) -> &str {
    match VARIANT_SUFFIX_RE.find(name) {
        Some(m) => name[..m.start()].trim(),
        None => name.trim(),
    }
}

/// Tier label from the trailing suffix of a variety name, or [`NO_VARIANT`].
#[must_use]
pub fn variant_label(name: &str) -> &'static str {
    let Some(caps) = VARIANT_SUFFIX_RE.captures(name) else {
        return NO_VARIANT;
    };
    match caps[1].to_lowercase().as_str() {
        "estándar" | "standard" => "Estándar",
        "primera" => "Primera",
        "premium" => "Premium",
        _ => NO_VARIANT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
    }

    /// Order created at `hh:mm` Mexico City time on the target date.
    fn created_local(hh: u32, mm: u32) -> DateTime<Utc> {
        offset()
            .with_ymd_and_hms(2026, 2, 9, hh, mm, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn line(variety_id: i64, name: &str, qty: i64, order_id: i64) -> DemandLine {
        DemandLine {
            variety_id,
            variety_name: name.to_string(),
            sku: format!("SKU-{variety_id}"),
            image_url: None,
            category: Some("Rosas".to_string()),
            quantity: qty,
            order_id,
            order_number: format!("#{order_id}"),
            client_name: format!("Cliente {order_id}"),
            location: "Monterrey".to_string(),
            is_vip: false,
            order_created_at: created_local(10, 0),
            delivery_date: date(),
        }
    }

    fn query() -> DemandQuery {
        DemandQuery {
            date: date(),
            window: TimeWindow::all_day(),
            offset: offset(),
            grouping: Grouping::Variety,
            category: None,
        }
    }

    fn commitment(variety_id: i64, captured: i64) -> CommitmentSnapshot {
        CommitmentSnapshot {
            commitment_id: variety_id * 10,
            variety_id,
            captured_qty: captured,
            captured_by: Some("Ana".to_string()),
        }
    }

    #[test]
    fn variance_and_fulfillment_for_partial_capture() {
        let lines = vec![line(1, "Rosa Roja", 100, 1)];
        let report = aggregate_demand(&query(), &lines, &[commitment(1, 80)]);
        let row = &report.rows[0];
        assert_eq!(row.demand, 100);
        assert_eq!(row.captured, 80);
        assert_eq!(row.variance, -20);
        assert_eq!(row.fulfillment_pct, 80);
        assert_eq!(row.commitment_id, Some(10));
        assert_eq!(row.captured_by.as_deref(), Some("Ana"));
    }

    #[test]
    fn zero_demand_yields_zero_fulfillment() {
        assert_eq!(fulfillment_pct(0, 0), 0);
        assert_eq!(fulfillment_pct(15, 0), 0);
    }

    #[test]
    fn fulfillment_rounds_half_up() {
        assert_eq!(fulfillment_pct(1, 3), 33);
        assert_eq!(fulfillment_pct(2, 3), 67);
        assert_eq!(fulfillment_pct(1, 8), 13);
        assert_eq!(fulfillment_pct(150, 100), 150);
    }

    #[test]
    fn quantities_for_same_variety_are_summed() {
        let lines = vec![line(1, "Rosa Roja", 30, 1), line(1, "Rosa Roja", 70, 2)];
        let report = aggregate_demand(&query(), &lines, &[]);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].demand, 100);
        assert_eq!(report.rows[0].orders.len(), 2);
        assert_eq!(report.total_demand, 100);
        assert_eq!(report.active_orders, 2);
        assert_eq!(report.distinct_clients, 2);
    }

    #[test]
    fn window_is_inclusive_at_minute_granularity() {
        let mut q = query();
        q.window = TimeWindow::parse(Some("12:00"), Some("13:00")).unwrap();

        let mut inside = line(1, "Rosa Roja", 5, 1);
        inside.order_created_at = created_local(12, 30);
        let mut before = line(1, "Rosa Roja", 7, 2);
        before.order_created_at = created_local(11, 59);
        let mut at_end = line(1, "Rosa Roja", 1, 3);
        at_end.order_created_at = created_local(13, 0) + chrono::Duration::seconds(45);

        let report = aggregate_demand(&q, &[inside, before, at_end], &[]);
        assert_eq!(report.rows[0].demand, 6);
        assert_eq!(report.active_orders, 2);
    }

    #[test]
    fn window_uses_local_time_not_utc() {
        let mut q = query();
        q.window = TimeWindow::parse(Some("12:00"), Some("13:00")).unwrap();
        let mut l = line(1, "Rosa Roja", 5, 1);
        // 12:30 UTC is 06:30 in the configured zone.
        l.order_created_at = Utc.with_ymd_and_hms(2026, 2, 9, 12, 30, 0).unwrap();
        let report = aggregate_demand(&q, &[l], &[]);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn other_delivery_dates_are_excluded() {
        let mut l = line(1, "Rosa Roja", 5, 1);
        l.delivery_date = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let report = aggregate_demand(&query(), &[l], &[]);
        assert!(report.rows.is_empty());
        assert_eq!(report.total_demand, 0);
    }

    #[test]
    fn commitment_without_matching_lines_is_not_shown() {
        let mut l = line(2, "Tulipán", 5, 1);
        l.delivery_date = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let report = aggregate_demand(&query(), &[l], &[commitment(2, 40)]);
        assert!(report.rows.is_empty());
    }

    #[test]
    fn base_product_grouping_merges_tiers() {
        let mut q = query();
        q.grouping = Grouping::BaseProduct;
        let lines = vec![
            line(1, "Rosa Roja - Estándar", 10, 1),
            line(2, "Rosa Roja - Premium", 5, 2),
            line(3, "Girasol", 4, 2),
        ];
        let report = aggregate_demand(&q, &lines, &[commitment(1, 6), commitment(2, 3)]);
        assert_eq!(report.rows.len(), 2);

        let girasol = &report.rows[0];
        assert_eq!(girasol.name, "Girasol");
        assert_eq!(girasol.variants.get(NO_VARIANT), Some(&4));

        let rosa = &report.rows[1];
        assert_eq!(rosa.name, "Rosa Roja");
        assert_eq!(rosa.demand, 15);
        assert_eq!(rosa.captured, 9);
        assert_eq!(rosa.variance, -6);
        assert_eq!(rosa.fulfillment_pct, 60);
        assert_eq!(rosa.variants.get("Estándar"), Some(&10));
        assert_eq!(rosa.variants.get("Premium"), Some(&5));
        assert_eq!(rosa.variety_ids, vec![1, 2]);
        assert!(rosa.sku.is_none());
        assert!(rosa.commitment_id.is_none());
        assert_eq!(report.active_orders, 2);
    }

    #[test]
    fn base_product_grouping_labels_tiers_by_suffix() {
        let mut q = query();
        q.grouping = Grouping::BaseProduct;
        let lines = vec![
            line(1, "Rosa Primera - Premium", 7, 1),
            line(2, "Rosa Primera ", 2, 2),
        ];
        let report = aggregate_demand(&q, &lines, &[]);
        assert_eq!(report.rows.len(), 1);

        let row = &report.rows[0];
        assert_eq!(row.name, "Rosa Primera");
        assert_eq!(row.variants.get("Premium"), Some(&7));
        assert_eq!(row.variants.get(NO_VARIANT), Some(&2));
        assert!(!row.variants.contains_key("Primera"));
    }

    #[test]
    fn category_filter_treats_missing_as_uncategorized() {
        let mut q = query();
        q.category = Some(UNCATEGORIZED.to_string());
        let mut bare = line(1, "Rosa Roja", 3, 1);
        bare.category = None;
        let lines = vec![bare, line(2, "Clavel", 9, 2)];
        let report = aggregate_demand(&q, &lines, &[]);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].name, "Rosa Roja");
        assert_eq!(report.rows[0].category, UNCATEGORIZED);
        assert_eq!(report.active_orders, 1);
    }

    #[test]
    fn rows_are_sorted_by_name() {
        let lines = vec![
            line(1, "Tulipán", 1, 1),
            line(2, "Alstroemeria", 1, 1),
            line(3, "Margarita", 1, 1),
        ];
        let report = aggregate_demand(&query(), &lines, &[]);
        let names: Vec<_> = report.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Alstroemeria", "Margarita", "Tulipán"]);
    }

    #[test]
    fn base_name_strips_known_suffixes_only() {
        assert_eq!(base_product_name("Rosa Roja - Premium"), "Rosa Roja");
        assert_eq!(base_product_name("Rosa Roja - standard"), "Rosa Roja");
        assert_eq!(base_product_name("Rosa Roja - Default Title"), "Rosa Roja");
        assert_eq!(base_product_name("Rosa Roja - Grande"), "Rosa Roja - Grande");
        assert_eq!(base_product_name("Premium"), "Premium");
        assert_eq!(base_product_name("Rosa  - Premium"), "Rosa");
    }

    #[test]
    fn variant_labels() {
        assert_eq!(variant_label("Rosa - Estándar"), "Estándar");
        assert_eq!(variant_label("Rosa - Standard"), "Estándar");
        assert_eq!(variant_label("Rosa - Primera"), "Primera");
        assert_eq!(variant_label("Rosa - PREMIUM"), "Premium");
        assert_eq!(variant_label("Rosa"), NO_VARIANT);
        assert_eq!(variant_label("Rosa - Default Title"), NO_VARIANT);
    }

    #[test]
    fn variant_label_reads_only_the_trailing_suffix() {
        assert_eq!(variant_label("Rosa Primera - Premium"), "Premium");
        assert_eq!(base_product_name("Rosa Primera - Premium"), "Rosa Primera");
        assert_eq!(variant_label("Premium Mix"), NO_VARIANT);
        assert_eq!(variant_label("Clavel Estándar Rojo"), NO_VARIANT);
    }

    #[test]
    fn window_parse_rejects_bad_input() {
        assert_eq!(
            TimeWindow::parse(Some("25:00"), None),
            Err(DemandError::InvalidTime("25:00".to_string()))
        );
        assert!(matches!(
            TimeWindow::parse(Some("14:00"), Some("09:00")),
            Err(DemandError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn window_defaults_cover_whole_day() {
        let w = TimeWindow::parse(None, None).unwrap();
        assert_eq!(w, TimeWindow::all_day());
        assert!(w.contains(NaiveTime::from_hms_opt(23, 59, 59).unwrap()));
        assert!(w.contains(NaiveTime::MIN));
    }
}
