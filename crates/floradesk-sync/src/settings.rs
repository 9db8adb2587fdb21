use floradesk_core::AppConfig;

const DEFAULT_LOOKBACK_DAYS: u32 = 60;
const DEFAULT_CATALOG_CAP: usize = 1_000;
const DEFAULT_OPEN_ORDERS_CAP: usize = 5_000;
const DEFAULT_RECENT_ORDERS_CAP: usize = 10_000;
const DEFAULT_CHUNK_SIZE: usize = 100;

/// Per-pass limits: fetch caps, the recent-order window, and the chunk size
/// used for every bulk statement in the apply phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub lookback_days: u32,
    pub catalog_cap: usize,
    pub open_orders_cap: usize,
    pub recent_orders_cap: usize,
    pub chunk_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            catalog_cap: DEFAULT_CATALOG_CAP,
            open_orders_cap: DEFAULT_OPEN_ORDERS_CAP,
            recent_orders_cap: DEFAULT_RECENT_ORDERS_CAP,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            lookback_days: config.sync_lookback_days,
            catalog_cap: config.sync_catalog_cap,
            open_orders_cap: config.sync_open_orders_cap,
            recent_orders_cap: config.sync_recent_orders_cap,
            chunk_size: config.sync_chunk_size.max(1),
        }
    }
}
