//! Multi-page accumulation for `ShopifyClient`.

use serde::de::DeserializeOwned;

use crate::endpoint::Endpoint;
use crate::error::ShopifyError;

use super::{ShopifyClient, MAX_PAGES};

/// Records gathered for one resource and the error that stopped the walk early,
/// if any.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub error: Option<ShopifyError>,
}

impl<T> FetchOutcome<T> {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

impl ShopifyClient {
    /// Follows `endpoint` page by page until the cursor runs out or
    /// `max_items` records have been gathered.
    ///
    /// A failing page ends the walk but keeps what earlier pages returned; the
    /// failure is logged and reported in [`FetchOutcome::error`]. The result is
    /// truncated to exactly `max_items`.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        max_items: usize,
    ) -> FetchOutcome<T> {
        let resource = endpoint.label();
        let mut items: Vec<T> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        while items.len() < max_items {
            if pages == MAX_PAGES {
                let error = ShopifyError::PaginationLimit {
                    resource: resource.clone(),
                    max_pages: MAX_PAGES,
                };
                tracing::warn!(resource = %resource, pages, error = %error, "stopped paginating");
                return FetchOutcome {
                    items,
                    pages,
                    error: Some(error),
                };
            }

            if pages > 0 && !self.inter_request_delay.is_zero() {
                tokio::time::sleep(self.inter_request_delay).await;
            }

            match self.fetch_page::<T>(endpoint, cursor.as_deref()).await {
                Ok(page) => {
                    pages += 1;
                    items.extend(page.items);
                    cursor = page.next_page_info;
                    if cursor.is_none() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        resource = %resource,
                        pages,
                        kept = items.len(),
                        error = %error,
                        "page fetch failed; keeping records gathered so far"
                    );
                    items.truncate(max_items);
                    return FetchOutcome {
                        items,
                        pages,
                        error: Some(error),
                    };
                }
            }
        }

        items.truncate(max_items);
        tracing::debug!(resource = %resource, pages, items = items.len(), "resource fetched");
        FetchOutcome {
            items,
            pages,
            error: None,
        }
    }
}
