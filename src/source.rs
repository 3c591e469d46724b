//! Product source abstraction layer.
//!
//! This module defines the [`FeedSource`] trait, the page types exchanged
//! with the feed controller, and the common [`Product`] type.  Concrete
//! sources live in sub-modules: [`rest`] (offset pagination against the demo
//! REST catalog) and [`document`] (cursor pagination against a
//! [`DocumentStore`](crate::store::DocumentStore)).
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory (e.g. `graphql.rs`).
//! 2. Define a struct and implement [`FeedSource`] for it.
//! 3. Add `mod graphql;` below and re-export your struct.
//! 4. Add a `SourceKind` variant in `config.rs` and build it in `main.rs`.
//!
//! The controller, worker and screens are all source-agnostic.

mod bootstrap;
mod document;
mod product;
mod rest;

pub use bootstrap::bootstrap_products;
pub use document::DocumentSource;
pub use product::{Product, ProductKey};
pub use rest::RestSource;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::store::{StoreError, StoredProduct};

/// Opaque position to resume pagination from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Number of items already skipped (offset pagination).
    Offset(usize),
    /// Identity of the last item seen (cursor pagination).
    After(String),
}

/// Category filter.  `All` is the "no filter" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    All,
    Named(String),
}

impl Category {
    pub fn as_filter(&self) -> Option<&str> {
        match self {
            Category::All => None,
            Category::Named(name) => Some(name),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Category::All
        } else {
            Category::Named(value.to_string())
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::All => f.write_str("All"),
            Category::Named(name) => f.write_str(name),
        }
    }
}

/// One "give me the next page" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: NonZeroUsize,
    /// `None` means the initial position.
    pub cursor: Option<Cursor>,
    pub category: Category,
}

/// One page of products, in the source's stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub products: Vec<Product>,
    /// Where to resume from, or `None` when no further page exists.
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog answered HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("malformed catalog response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("document store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid catalog url {0}")]
    InvalidUrl(String),
    #[error("{0} is not supported by this source")]
    Unsupported(&'static str),
}

/// Called once per product inserted into the backing store.
pub type InsertCallback = Box<dyn Fn(Product) + Send + Sync>;

/// Handle for an insertion subscription.
///
/// [`unsubscribe`](Subscription::unsubscribe) may be called any number of
/// times; only the first call does anything.  Dropping the handle
/// unsubscribes as well.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    pub fn unsubscribe(&self) {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Trait that every product source must implement.
///
/// The worker calls [`fetch_page()`](FeedSource::fetch_page) on a background
/// thread, so implementations must be [`Send`] + [`Sync`].
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* config fields */ }
///
/// impl FeedSource for MySource {
///     fn name(&self) -> &str { "my-source" }
///
///     fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
///         // Perform HTTP / IO, then convert into Product values.
///         todo!()
///     }
/// }
/// ```
pub trait FeedSource: Send + Sync {
    /// Human-readable label shown in the header.
    fn name(&self) -> &str;

    /// Fetch one page.
    ///
    /// Results must be ordered by the product key so that repeating a request
    /// with the same cursor yields the same leading products.  A `Named`
    /// category must only return products of that category.  Errors are
    /// returned, never panicked on; the controller decides how to degrade.
    fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError>;

    /// Subscribe to products inserted into the backing store from now on.
    ///
    /// Sources without a change stream return `None`.
    fn subscribe_to_insertions(&self, _on_insert: InsertCallback) -> Option<Subscription> {
        None
    }

    /// Populate an empty backing store with `products`.
    fn seed(&self, _products: &[StoredProduct]) -> Result<usize, FetchError> {
        Err(FetchError::Unsupported("seeding"))
    }
}
