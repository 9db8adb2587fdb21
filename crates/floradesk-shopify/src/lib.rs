pub mod client;
pub mod endpoint;
pub mod error;
pub mod pagination;
pub mod reconcile;
pub mod types;

pub use client::{ClientOptions, FetchOutcome, Page, ShopifyClient};
pub use endpoint::Endpoint;
pub use error::ShopifyError;
pub use reconcile::{
    build_category_index, extract_varieties, merge_orders, parse_delivery_date, reconcile_order,
    CategoryIndex,
};
pub use types::{
    ShopifyCollect, ShopifyCollection, ShopifyCustomer, ShopifyImage, ShopifyLineItem,
    ShopifyNoteAttribute, ShopifyOrder, ShopifyProduct, ShopifyShippingAddress, ShopifyVariant,
};
