//! The Admin API resources read by a sync pass.

use chrono::{DateTime, SecondsFormat, Utc};

/// A resource path, its first-page query parameters, and the JSON key its
/// records are wrapped in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: &'static str,
    pub envelope: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl Endpoint {
    #[must_use]
    pub fn products() -> Self {
        Self {
            path: "products.json",
            envelope: "products",
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn custom_collections() -> Self {
        Self {
            path: "custom_collections.json",
            envelope: "custom_collections",
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn smart_collections() -> Self {
        Self {
            path: "smart_collections.json",
            envelope: "smart_collections",
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn collects() -> Self {
        Self {
            path: "collects.json",
            envelope: "collects",
            params: Vec::new(),
        }
    }

    /// Every open order, regardless of age.
    #[must_use]
    pub fn open_orders() -> Self {
        Self {
            path: "orders.json",
            envelope: "orders",
            params: vec![("status", "open".to_string())],
        }
    }

    /// Orders in any status created at or after `since`.
    #[must_use]
    pub fn orders_created_since(since: DateTime<Utc>) -> Self {
        Self {
            path: "orders.json",
            envelope: "orders",
            params: vec![
                ("status", "any".to_string()),
                (
                    "created_at_min",
                    since.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
            ],
        }
    }

    /// Short label for logs and error messages, e.g. `orders?status=open`.
    #[must_use]
    pub fn label(&self) -> String {
        let resource = self.path.trim_end_matches(".json");
        match self.params.first() {
            Some((key, value)) => format!("{resource}?{key}={value}"),
            None => resource.to_string(),
        }
    }
}
