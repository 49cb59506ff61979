//! Main document store interface.
//!
//! [`DocumentStore`] is a cheaply cloneable handle around a shared
//! [`StoreBackend`](crate::backend::StoreBackend) trait object. Components receive one at
//! construction instead of reaching for a global client, which lets tests substitute the
//! in-memory backend.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::store::DocumentStore;
//! use docbridge::memory::InMemoryStore;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let profiles = store.typed_collection::<Profile>()?;
//! ```

use std::sync::Arc;

use crate::{
    backend::StoreBackend,
    collection::{Collection, TypedCollection},
    document::{Document, StoredDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{CollectionPath, Query},
};

/// A shared handle to a document store backend.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    backend: Arc<dyn StoreBackend>,
}

impl DocumentStore {
    /// Creates a new document store with the given backend.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Gets an untyped collection handle for `path`.
    pub fn collection(&self, path: CollectionPath) -> Collection<'_> {
        Collection::new(path, self.backend.as_ref())
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection path is determined by the document type's `collection_name()`.
    ///
    /// # Errors
    ///
    /// Returns an error if `collection_name()` is not a valid collection path.
    pub fn typed_collection<D: Document>(&self) -> DocumentStoreResult<TypedCollection<'_, D>> {
        let path = CollectionPath::parse(D::collection_name())
            .map_err(|e| DocumentStoreError::InvalidArgument(e.to_string()))?;

        Ok(TypedCollection::new(path, self.backend.as_ref()))
    }

    /// Runs a query against the collection it names.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects or fails the query.
    pub async fn query(&self, query: &Query) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.backend.query_documents(query).await
    }

    /// Shuts the backend down.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release its resources.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}
