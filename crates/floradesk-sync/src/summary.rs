use serde::Serialize;

/// A resource whose fetch stopped early; the pass used what was gathered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchWarning {
    pub resource: String,
    pub error: String,
}

/// What a completed pass did, including every non-fatal degradation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub varieties_derived: usize,
    pub variety_upsert_failed: bool,
    pub orders_synced: usize,
    pub rescheduled_orders: usize,
    pub items_inserted: u64,
    pub item_chunks_failed: usize,
    /// Lines whose SKU matched no stored variety.
    pub items_dropped: usize,
    pub commitments_created: u64,
    pub commitment_failures: usize,
    pub fetch_warnings: Vec<FetchWarning>,
}

impl SyncSummary {
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Synced: {} varieties, {} orders",
            self.varieties_derived, self.orders_synced
        )
    }

    /// True when any part of the pass was skipped or failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.variety_upsert_failed
            || self.item_chunks_failed > 0
            || self.items_dropped > 0
            || self.commitment_failures > 0
            || !self.fetch_warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_reports_varieties_and_orders() {
        let summary = SyncSummary {
            varieties_derived: 42,
            orders_synced: 7,
            ..SyncSummary::default()
        };
        assert_eq!(summary.message(), "Synced: 42 varieties, 7 orders");
        assert!(!summary.is_degraded());
    }

    #[test]
    fn warnings_mark_summary_degraded() {
        let summary = SyncSummary {
            fetch_warnings: vec![FetchWarning {
                resource: "collects".to_string(),
                error: "HTTP 502".to_string(),
            }],
            ..SyncSummary::default()
        };
        assert!(summary.is_degraded());
    }
}
