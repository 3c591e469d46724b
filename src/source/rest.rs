//! REST catalog source.
//!
//! Offset/limit pagination against a dummyjson-style product listing:
//!
//! ```text
//! GET {base}/products?limit=10&skip=20
//! GET {base}/products/category/{category}?limit=10&skip=20
//! ```
//!
//! The response body is `{ "products": [...], "total": N, "skip": S, "limit": L }`.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::{Cursor, FeedSource, FetchError, Page, PageRequest, Product, ProductKey};

/// A product source backed by a paginated HTTP listing.
pub struct RestSource {
    client: Client,
    base: Url,
    label: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    products: Vec<ListedProduct>,
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    skip: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ListedProduct {
    id: u64,
    title: String,
    price: f64,
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
}

impl From<ListedProduct> for Product {
    fn from(item: ListedProduct) -> Self {
        Product {
            key: ProductKey::Numeric(item.id),
            title: item.title,
            price: item.price,
            thumbnail: item.thumbnail,
            description: item.description,
            category: item.category,
        }
    }
}

impl RestSource {
    /// Create a new REST source.
    ///
    /// # Arguments
    ///
    /// * `base_url` — catalog root, e.g. `https://dummyjson.com`.
    /// * `label` — short name shown in the list header.
    /// * `timeout` — per-request timeout.
    /// * `user_agent` — value of the `User-Agent` header.
    pub fn new(
        base_url: &str,
        label: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let base = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            label: label.into(),
        })
    }

    /// Listing URL for `request`, without the paging query.
    fn listing_url(&self, request: &PageRequest) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| FetchError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push("products");
            if let Some(category) = request.category.as_filter() {
                segments.push("category").push(category);
            }
        }
        Ok(url)
    }

    /// Parse a listing body fetched at `offset` into a [`Page`].
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// pagination bookkeeping without hitting the network.
    pub fn parse_listing(body: &[u8], offset: usize) -> Result<Page, FetchError> {
        let listing: Listing = serde_json::from_slice(body)?;
        let skip = listing.skip.unwrap_or(offset);
        let products: Vec<Product> = listing.products.into_iter().map(Product::from).collect();

        // Without a total we can only guess that more might follow.
        let end = skip + products.len();
        let next_cursor = match listing.total {
            _ if products.is_empty() => None,
            Some(total) if end >= total => None,
            _ => Some(Cursor::Offset(end)),
        };

        Ok(Page {
            products,
            next_cursor,
        })
    }
}

impl FeedSource for RestSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
        let offset = match &request.cursor {
            Some(Cursor::Offset(offset)) => *offset,
            Some(Cursor::After(_)) | None => 0,
        };
        let url = self.listing_url(request)?;
        debug!(%url, limit = request.page_size.get(), skip = offset, "fetching catalog page");

        let response = self
            .client
            .get(url.clone())
            .query(&[("limit", request.page_size.get()), ("skip", offset)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes()?;
        Self::parse_listing(&body, offset)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Category;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::num::NonZeroUsize;

    fn listing(ids: std::ops::Range<u64>, total: usize, skip: usize) -> serde_json::Value {
        let products: Vec<_> = ids
            .map(|id| {
                json!({
                    "id": id,
                    "title": format!("Product {id}"),
                    "price": 10 * id,
                    "thumbnail": format!("https://cdn.dummyjson.com/{id}.png"),
                    "description": "desc",
                    "category": "beauty",
                })
            })
            .collect();
        json!({ "products": products, "total": total, "skip": skip, "limit": 10 })
    }

    fn source(base: &str) -> RestSource {
        RestSource::new(base, "Catalog", Duration::from_secs(2), "storefront-tests").unwrap()
    }

    fn request(cursor: Option<Cursor>, category: Category) -> PageRequest {
        PageRequest {
            page_size: NonZeroUsize::new(10).unwrap(),
            cursor,
            category,
        }
    }

    #[test]
    fn parse_listing_extracts_products_and_next_offset() {
        let body = serde_json::to_vec(&listing(1..11, 34, 0)).unwrap();
        let page = RestSource::parse_listing(&body, 0).unwrap();

        assert_eq!(page.products.len(), 10);
        assert_eq!(page.products[0].key, ProductKey::Numeric(1));
        assert_eq!(page.products[0].title, "Product 1");
        assert_eq!(page.products[0].category.as_deref(), Some("beauty"));
        assert_eq!(page.next_cursor, Some(Cursor::Offset(10)));
    }

    #[test]
    fn last_page_has_no_next_cursor() {
        let body = serde_json::to_vec(&listing(31..35, 34, 30)).unwrap();
        let page = RestSource::parse_listing(&body, 30).unwrap();

        assert_eq!(page.products.len(), 4);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn empty_listing_has_no_next_cursor() {
        let page = RestSource::parse_listing(br#"{"products": []}"#, 0).unwrap();
        assert!(page.products.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn missing_optional_fields_default() {
        let body = br#"{"products": [{"id": 3, "title": "Bare", "price": 1.5}]}"#;
        let page = RestSource::parse_listing(body, 20).unwrap();

        let p = &page.products[0];
        assert_eq!(p.thumbnail, "");
        assert_eq!(p.description, "");
        assert!(p.category.is_none());
        assert_eq!(page.next_cursor, Some(Cursor::Offset(21)));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = RestSource::parse_listing(b"<html>", 0).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            RestSource::new("not a url", "x", Duration::from_secs(1), "ua"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn fetch_page_sends_limit_and_skip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/products")
                .query_param("limit", "10")
                .query_param("skip", "20");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(listing(21..31, 34, 20));
        });

        let page = source(&server.base_url())
            .fetch_page(&request(Some(Cursor::Offset(20)), Category::All))
            .unwrap();

        mock.assert();
        assert_eq!(page.products.len(), 10);
        assert_eq!(page.products[0].key, ProductKey::Numeric(21));
        assert_eq!(page.next_cursor, Some(Cursor::Offset(30)));
    }

    #[test]
    fn fetch_page_uses_category_path() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/products/category/beauty")
                .query_param("skip", "0");
            then.status(200).json_body(listing(1..6, 5, 0));
        });

        let page = source(&server.base_url())
            .fetch_page(&request(None, Category::Named("beauty".into())))
            .unwrap();

        mock.assert();
        assert!(page
            .products
            .iter()
            .all(|p| p.category.as_deref() == Some("beauty")));
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn server_error_is_reported_as_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products");
            then.status(503);
        });

        let err = source(&server.base_url())
            .fetch_page(&request(None, Category::All))
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[test]
    fn name_returns_label() {
        assert_eq!(source("http://example.com").name(), "Catalog");
    }
}
