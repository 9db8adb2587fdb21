use std::net::SocketAddr;

use chrono::FixedOffset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Shop domain and Admin API token, resolved together for a sync pass.
#[derive(Clone, PartialEq, Eq)]
pub struct ShopifyCredentials {
    pub shop_domain: String,
    pub access_token: String,
}

impl std::fmt::Debug for ShopifyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyCredentials")
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub shopify_shop_domain: Option<String>,
    pub shopify_access_token: Option<String>,
    pub shopify_api_version: String,
    pub shopify_timeout_secs: u64,
    pub shopify_user_agent: String,
    pub shopify_page_size: u32,
    pub shopify_inter_request_delay_ms: u64,
    pub sync_lookback_days: u32,
    pub sync_catalog_cap: usize,
    pub sync_open_orders_cap: usize,
    pub sync_recent_orders_cap: usize,
    pub sync_chunk_size: usize,
    /// `None` disables the scheduled sync.
    pub sync_cron: Option<String>,
    pub demand_utc_offset: FixedOffset,
    pub api_keys: Vec<String>,
}

impl AppConfig {
    /// Resolve the Shopify credentials required by a sync pass.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::MissingEnvVar`] naming the first absent
    /// variable when the shop domain or access token is not configured.
    pub fn shopify_credentials(&self) -> Result<ShopifyCredentials, crate::ConfigError> {
        let shop_domain = self
            .shopify_shop_domain
            .clone()
            .ok_or_else(|| crate::ConfigError::MissingEnvVar("SHOPIFY_SHOP_URL".to_string()))?;
        let access_token = self.shopify_access_token.clone().ok_or_else(|| {
            crate::ConfigError::MissingEnvVar("SHOPIFY_ACCESS_TOKEN".to_string())
        })?;
        Ok(ShopifyCredentials {
            shop_domain,
            access_token,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("shopify_shop_domain", &self.shopify_shop_domain)
            .field(
                "shopify_access_token",
                &self.shopify_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("shopify_api_version", &self.shopify_api_version)
            .field("shopify_timeout_secs", &self.shopify_timeout_secs)
            .field("shopify_user_agent", &self.shopify_user_agent)
            .field("shopify_page_size", &self.shopify_page_size)
            .field(
                "shopify_inter_request_delay_ms",
                &self.shopify_inter_request_delay_ms,
            )
            .field("sync_lookback_days", &self.sync_lookback_days)
            .field("sync_catalog_cap", &self.sync_catalog_cap)
            .field("sync_open_orders_cap", &self.sync_open_orders_cap)
            .field("sync_recent_orders_cap", &self.sync_recent_orders_cap)
            .field("sync_chunk_size", &self.sync_chunk_size)
            .field("sync_cron", &self.sync_cron)
            .field("demand_utc_offset", &self.demand_utc_offset)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .finish()
    }
}
