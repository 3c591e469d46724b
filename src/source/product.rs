//! The core data type shared across all product sources.
//!
//! `Product` represents a single catalog entry from any source (REST catalog,
//! document store, ...).  Every source converts its native record into
//! `Product`s so the feed controller and the screens can stay source-agnostic.
//!
//! ## Identity
//!
//! Each product carries a [`ProductKey`].  The key is what the feed
//! de-duplicates on and what the list uses as its row key, so sources must
//! pick a stable one: the REST catalog uses its integer id, the document
//! store uses the store-assigned document id.

use std::fmt;

/// Identity key of a product.  Keys are only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductKey {
    /// Integer id handed out by the REST catalog.
    Numeric(u64),
    /// Opaque document id assigned by the document store.
    Document(String),
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKey::Numeric(id) => write!(f, "{id}"),
            ProductKey::Document(doc_id) => f.write_str(doc_id),
        }
    }
}

/// A single product, normalised from any source.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Unique identifier used for de-duplication and as the list key.
    pub key: ProductKey,

    /// Human-readable product name.
    pub title: String,

    /// Unit price.  Currency is a display concern (see `ui.currency`).
    pub price: f64,

    /// URI of the thumbnail image.
    pub thumbnail: String,

    /// Longer product description.
    pub description: String,

    /// Category slug, when the source provides one.
    pub category: Option<String>,
}

impl Product {
    /// Price as shown to the user, e.g. `₹ 80000` or `$ 9.99`.
    ///
    /// Whole amounts are printed without a fractional part.
    pub fn display_price(&self, currency: &str) -> String {
        format!("{currency} {}", format_amount(self.price))
    }
}

pub(crate) fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{amount:.2}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
