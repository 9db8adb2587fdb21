//! Authenticated client for the Shopify Admin REST API.

mod fetch_all;

use std::time::Duration;

use floradesk_core::{AppConfig, ShopifyCredentials};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::endpoint::Endpoint;
use crate::error::ShopifyError;
use crate::pagination::next_page_info;

pub use fetch_all::FetchOutcome;

/// Maximum number of pages followed for one resource. Stops a cycling cursor.
pub const MAX_PAGES: usize = 200;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Shopify's leaky bucket refills at two requests per second.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Request settings shared by every call a client makes.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_version: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// `limit` query parameter; the Admin API caps it at 250.
    pub page_size: u32,
    pub inter_request_delay_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_version: "2024-01".to_string(),
            timeout_secs: 30,
            user_agent: "floradesk/0.1 (order-sync)".to_string(),
            page_size: 250,
            inter_request_delay_ms: 0,
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_version: config.shopify_api_version.clone(),
            timeout_secs: config.shopify_timeout_secs,
            user_agent: config.shopify_user_agent.clone(),
            page_size: config.shopify_page_size,
            inter_request_delay_ms: config.shopify_inter_request_delay_ms,
        }
    }
}

/// One page of records plus the cursor for the page after it.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_info: Option<String>,
}

/// Reads paginated Admin API resources for a single shop.
///
/// Non-2xx answers become typed errors; nothing is retried.
pub struct ShopifyClient {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) access_token: String,
    pub(crate) page_size: u32,
    pub(crate) inter_request_delay: Duration,
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"[redacted]")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl ShopifyClient {
    /// Creates a client targeting `https://{shop}/admin/api/{version}/`.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidUrl`] if the shop domain does not form a
    /// valid URL, or [`ShopifyError::Http`] if the `reqwest::Client` cannot be
    /// built.
    pub fn new(
        credentials: &ShopifyCredentials,
        options: &ClientOptions,
    ) -> Result<Self, ShopifyError> {
        let base = format!(
            "https://{}/admin/api/{}/",
            credentials.shop_domain.trim_end_matches('/'),
            options.api_version
        );
        Self::with_base_url(&base, &credentials.access_token, options)
    }

    /// Creates a client rooted at an arbitrary base URL, e.g. a mock server.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::InvalidUrl`] if `base_url` cannot be parsed,
    /// or [`ShopifyError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        base_url: &str,
        access_token: &str,
        options: &ClientOptions,
    ) -> Result<Self, ShopifyError> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| ShopifyError::InvalidUrl {
            url: normalized.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ShopifyError::InvalidUrl {
                url: normalized,
                reason: "cannot be used as a base URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_string(),
            page_size: options.page_size,
            inter_request_delay: Duration::from_millis(options.inter_request_delay_ms),
        })
    }

    /// Fetches one page of `endpoint`.
    ///
    /// The first page carries the endpoint's own query parameters; follow-up
    /// pages carry only `limit` and `page_info`, which the Admin API requires.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::RateLimited`] on HTTP 429.
    /// - [`ShopifyError::NotFound`] on HTTP 404.
    /// - [`ShopifyError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`ShopifyError::Http`] on network or TLS failure.
    /// - [`ShopifyError::Deserialize`] if the body or its envelope is malformed.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        page_info: Option<&str>,
    ) -> Result<Page<T>, ShopifyError> {
        let url = self.page_url(endpoint, page_info)?;

        let response = self
            .client
            .get(url.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map_or(DEFAULT_RETRY_AFTER_SECS, parse_retry_after);
            return Err(ShopifyError::RateLimited {
                resource: endpoint.label(),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ShopifyError::NotFound {
                url: redact_url(&url),
            });
        }

        if !status.is_success() {
            return Err(ShopifyError::UnexpectedStatus {
                status: status.as_u16(),
                url: redact_url(&url),
            });
        }

        let link_header = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await?;
        let items = parse_envelope::<T>(&body, endpoint)?;

        Ok(Page {
            items,
            next_page_info: next_page_info(link_header.as_deref()),
        })
    }

    fn page_url(&self, endpoint: &Endpoint, page_info: Option<&str>) -> Result<Url, ShopifyError> {
        let mut url = self
            .base_url
            .join(endpoint.path)
            .map_err(|e| ShopifyError::InvalidUrl {
                url: format!("{}{}", self.base_url, endpoint.path),
                reason: e.to_string(),
            })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.page_size.to_string());
            match page_info {
                Some(cursor) => {
                    query.append_pair("page_info", cursor);
                }
                None => {
                    for (key, value) in &endpoint.params {
                        query.append_pair(key, value);
                    }
                }
            }
        }

        Ok(url)
    }
}

/// Pulls the record array out of `{"<envelope>": [...]}`.
fn parse_envelope<T: DeserializeOwned>(
    body: &str,
    endpoint: &Endpoint,
) -> Result<Vec<T>, ShopifyError> {
    let context = || format!("{} page", endpoint.label());

    let mut value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| ShopifyError::Deserialize {
            context: context(),
            source,
        })?;

    let records = value
        .get_mut(endpoint.envelope)
        .map_or(serde_json::Value::Array(Vec::new()), serde_json::Value::take);

    serde_json::from_value::<Vec<T>>(records).map_err(|source| ShopifyError::Deserialize {
        context: context(),
        source,
    })
}

/// Shopify sends fractional seconds, e.g. `"2.0"`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_retry_after(raw: &str) -> u64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(DEFAULT_RETRY_AFTER_SECS, |secs| secs.ceil() as u64)
}

/// Drops the query string, which may carry a cursor, from URLs in errors.
fn redact_url(url: &Url) -> String {
    let mut trimmed = url.clone();
    trimmed.set_query(None);
    trimmed.to_string()
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
