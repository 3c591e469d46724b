//! Document store source.
//!
//! Cursor pagination over a [`DocumentStore`] collection: each page is an
//! ordered query starting strictly after the last document id of the previous
//! page.  A page shorter than requested is the last one.
//!
//! This source also exposes the store's insertion stream and can seed an
//! empty collection.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Cursor, FeedSource, FetchError, InsertCallback, Page, PageRequest, Subscription};
use crate::store::{Document, DocumentStore, Query, StoredProduct};

pub struct DocumentSource {
    store: Arc<dyn DocumentStore>,
    label: String,
}

impl DocumentSource {
    pub fn new(store: Arc<dyn DocumentStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }
}

impl FeedSource for DocumentSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch_page(&self, request: &PageRequest) -> Result<Page, FetchError> {
        let start_after = match &request.cursor {
            Some(Cursor::After(doc_id)) => Some(doc_id.clone()),
            Some(Cursor::Offset(offset)) => {
                warn!(offset, "offset cursor passed to document source, starting from the top");
                None
            }
            None => None,
        };
        let query = Query {
            category: request.category.as_filter().map(str::to_string),
            start_after,
            limit: request.page_size.get(),
        };
        debug!(?query, "querying document store");

        let documents = self.store.query(&query)?;
        let next_cursor = if documents.len() == request.page_size.get() {
            documents.last().map(|doc| Cursor::After(doc.doc_id.clone()))
        } else {
            None
        };

        Ok(Page {
            products: documents.into_iter().map(Document::into_product).collect(),
            next_cursor,
        })
    }

    fn subscribe_to_insertions(&self, on_insert: InsertCallback) -> Option<Subscription> {
        let listener = Arc::new(move |doc: &Document| on_insert(doc.clone().into_product()));
        match self.store.listen(listener) {
            Ok(id) => {
                let store = Arc::clone(&self.store);
                Some(Subscription::new(move || store.unlisten(id)))
            }
            Err(e) => {
                warn!(error = %e, "could not subscribe to product insertions");
                None
            }
        }
    }

    /// Inserts `products` only when the collection is empty.
    fn seed(&self, products: &[StoredProduct]) -> Result<usize, FetchError> {
        if self.store.count()? > 0 {
            debug!("store already populated, skipping seed");
            return Ok(0);
        }
        for product in products {
            self.store.insert(product.clone())?;
        }
        info!(count = products.len(), "seeded document store");
        Ok(products.len())
    }
}
