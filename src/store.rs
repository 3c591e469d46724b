//! Document store backing the cursor-paginated product source.
//!
//! A store holds one collection of product documents keyed by a
//! store-assigned `doc_id`.  It answers ordered queries (by `doc_id`) with an
//! optional category equality filter and a start-after cursor, and notifies
//! listeners of every insertion.
//!
//! [`LocalStore`] is the bundled implementation: an in-process collection,
//! optionally persisted to a JSON file.  Hosted databases plug in by
//! implementing [`DocumentStore`].

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::source::{Product, ProductKey};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Product fields as stored in a document.
///
/// `id` is whatever numeric id the record was created with.  It is kept for
/// display only; identity is always the document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub doc_id: String,
    pub data: StoredProduct,
}

impl Document {
    pub fn into_product(self) -> Product {
        Product {
            key: ProductKey::Document(self.doc_id),
            title: self.data.title,
            price: self.data.price,
            thumbnail: self.data.thumbnail,
            description: self.data.description,
            category: self.data.category,
        }
    }
}

/// Ordered query over the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Equality filter on `category`.
    pub category: Option<String>,
    /// Only documents whose id sorts strictly after this one.
    pub start_after: Option<String>,
    pub limit: usize,
}

/// Insertion callback.  Runs while the collection lock is held and must not
/// call back into the store.
pub type Listener = Arc<dyn Fn(&Document) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

pub trait DocumentStore: Send + Sync {
    /// Documents matching `query`, ordered by `doc_id`.
    fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Insert a new document and notify listeners.
    fn insert(&self, data: StoredProduct) -> Result<Document, StoreError>;

    fn listen(&self, listener: Listener) -> Result<ListenerId, StoreError>;

    /// Remove a listener.  Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);

    /// Number of documents in the collection.
    fn count(&self) -> Result<usize, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    documents: BTreeMap<String, StoredProduct>,
}

#[derive(Default)]
struct Collection {
    documents: BTreeMap<String, StoredProduct>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

/// Embedded document store.
pub struct LocalStore {
    inner: Mutex<Collection>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Collection::default()),
            path: None,
        }
    }

    /// Open a store persisted at `path`.
    ///
    /// A missing file yields an empty store.  A corrupt file falls back to
    /// the `.json.tmp` left by an interrupted write, then to empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let snapshot = read_snapshot(&path);
        debug!(path = %path.display(), documents = snapshot.documents.len(), "opened document store");

        Self {
            inner: Mutex::new(Collection {
                documents: snapshot.documents,
                ..Collection::default()
            }),
            path: Some(path),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collection>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    fn persist(&self, documents: &BTreeMap<String, StoredProduct>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&SnapshotRef { documents })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Atomic replace
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    documents: &'a BTreeMap<String, StoredProduct>,
}

fn read_snapshot(path: &Path) -> Snapshot {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return Snapshot::default(),
    };
    match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to parse store, trying tmp fallback");
            std::fs::read(path.with_extension("json.tmp"))
                .ok()
                .and_then(|tmp| serde_json::from_slice(&tmp).ok())
                .unwrap_or_default()
        }
    }
}

impl DocumentStore for LocalStore {
    fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let inner = self.lock()?;
        let lower = match &query.start_after {
            Some(after) => Bound::Excluded(after.as_str()),
            None => Bound::Unbounded,
        };

        Ok(inner
            .documents
            .range::<str, _>((lower, Bound::Unbounded))
            .filter(|(_, data)| match &query.category {
                Some(category) => data.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .take(query.limit)
            .map(|(doc_id, data)| Document {
                doc_id: doc_id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    fn insert(&self, data: StoredProduct) -> Result<Document, StoreError> {
        let mut inner = self.lock()?;
        // v7 ids sort in creation order
        let doc_id = Uuid::now_v7().simple().to_string();
        inner.documents.insert(doc_id.clone(), data.clone());

        if let Err(e) = self.persist(&inner.documents) {
            inner.documents.remove(&doc_id);
            return Err(e);
        }

        let document = Document { doc_id, data };
        for (_, listener) in &inner.listeners {
            listener(&document);
        }
        Ok(document)
    }

    fn listen(&self, listener: Listener) -> Result<ListenerId, StoreError> {
        let mut inner = self.lock()?;
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        match self.lock() {
            Ok(mut inner) => inner.listeners.retain(|(existing, _)| *existing != id),
            Err(e) => warn!(error = %e, "could not remove store listener"),
        }
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.documents.len())
    }
}
