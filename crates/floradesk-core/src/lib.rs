mod app_config;
mod config;
pub mod demand;
pub mod entities;

pub use app_config::{AppConfig, Environment, ShopifyCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use demand::{
    aggregate_demand, base_product_name, fulfillment_pct, local_time_of_day, variant_label,
    CommitmentSnapshot, DemandError, DemandLine, DemandQuery, DemandReport, DemandRow, Grouping,
    OrderContribution, TimeWindow,
};
pub use entities::{NewOrder, NewVariety, OrderLine, OrderStatus, ReconciledOrder, ITEM_UNIT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
