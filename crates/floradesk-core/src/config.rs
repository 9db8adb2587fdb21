use chrono::FixedOffset;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Unset and blank are treated alike for optional values.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("FLORADESK_ENV", "development"))?;

    let bind_addr = or_default("FLORADESK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FLORADESK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("FLORADESK_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("FLORADESK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FLORADESK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FLORADESK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let shopify_shop_domain = optional("SHOPIFY_SHOP_URL")
        .or_else(|| optional("SHOPIFY_STORE_DOMAIN"))
        .map(|raw| normalize_shop_domain(&raw));
    let shopify_access_token = optional("SHOPIFY_ACCESS_TOKEN");
    let shopify_api_version = or_default("SHOPIFY_API_VERSION", "2024-01");
    let shopify_timeout_secs = parse_u64("FLORADESK_SHOPIFY_TIMEOUT_SECS", "30")?;
    let shopify_user_agent = or_default(
        "FLORADESK_SHOPIFY_USER_AGENT",
        "floradesk/0.1 (order-sync)",
    );
    let shopify_page_size = parse_u32("FLORADESK_SHOPIFY_PAGE_SIZE", "250")?;
    if !(1..=250).contains(&shopify_page_size) {
        return Err(invalid(
            "FLORADESK_SHOPIFY_PAGE_SIZE",
            format!("{shopify_page_size} is outside 1..=250"),
        ));
    }
    let shopify_inter_request_delay_ms =
        parse_u64("FLORADESK_SHOPIFY_INTER_REQUEST_DELAY_MS", "0")?;

    let sync_lookback_days = parse_u32("FLORADESK_SYNC_LOOKBACK_DAYS", "60")?;
    let sync_catalog_cap = parse_positive_usize("FLORADESK_SYNC_CATALOG_CAP", "1000")?;
    let sync_open_orders_cap = parse_positive_usize("FLORADESK_SYNC_OPEN_ORDERS_CAP", "5000")?;
    let sync_recent_orders_cap =
        parse_positive_usize("FLORADESK_SYNC_RECENT_ORDERS_CAP", "10000")?;
    let sync_chunk_size = parse_positive_usize("FLORADESK_SYNC_CHUNK_SIZE", "100")?;
    let sync_cron = match lookup("FLORADESK_SYNC_CRON") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(raw.trim().to_string()),
        Err(_) => Some("0 */30 * * * *".to_string()),
    };

    let demand_utc_offset = parse_utc_offset(&or_default(
        "FLORADESK_DEMAND_UTC_OFFSET_MINUTES",
        "-360",
    ))?;

    let api_keys = lookup("FLORADESK_API_KEYS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        shopify_shop_domain,
        shopify_access_token,
        shopify_api_version,
        shopify_timeout_secs,
        shopify_user_agent,
        shopify_page_size,
        shopify_inter_request_delay_ms,
        sync_lookback_days,
        sync_catalog_cap,
        sync_open_orders_cap,
        sync_recent_orders_cap,
        sync_chunk_size,
        sync_cron,
        demand_utc_offset,
        api_keys,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FLORADESK_ENV".to_string(),
            reason: format!("unknown environment: {other}"),
        }),
    }
}

/// Parse a signed minute count into a fixed UTC offset.
fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let var = "FLORADESK_DEMAND_UTC_OFFSET_MINUTES";
    let minutes = raw
        .trim()
        .parse::<i32>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("{minutes} minutes is not a valid UTC offset"),
        })
}

/// Strip scheme, path, and trailing slashes from a shop URL so that
/// `https://example.myshopify.com/` and `example.myshopify.com` agree.
fn normalize_shop_domain(raw: &str) -> String {
    let without_scheme = raw
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_ascii_lowercase()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
