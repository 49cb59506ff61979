//! Storage backend abstraction for the document store.
//!
//! This module defines the trait that abstracts over document database engines, allowing
//! the gateway to work with an in-memory store in tests and a real database in
//! production.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for the single-document
//! mutations and the collection reads the gateway performs. Implementations must be
//! thread-safe (`Send + Sync`) and support concurrent access; per-document atomicity of
//! a single mutation is the backend's responsibility.
//!
//! # Examples
//!
//! ```ignore
//! use docbridge::backend::StoreBackend;
//! use docbridge::query::{CollectionPath, Query};
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let users = CollectionPath::parse("users")?;
//!
//! let id = backend.add_document(&users, doc! { "name": "Alice" }).await?;
//! let all = backend.query_documents(&Query::scan(users)).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    document::{Fields, StoredDocument},
    error::DocumentStoreResult,
    query::{CollectionPath, Query},
};

/// Abstract interface for document storage backends.
///
/// # Identifiers
///
/// Identifiers are strings. [`StoreBackend::add_document`] lets the backend pick one;
/// the other mutations address an explicit identifier. Field mappings passed in never
/// contain the identifier, and field mappings handed back never contain it either: it
/// travels separately in [`StoredDocument::id`].
///
/// # Ordering
///
/// [`StoreBackend::query_documents`] must apply the filter clauses as a logical AND and
/// the sort clauses in the order given, earlier clauses taking priority. Documents that
/// tie on every sort clause are returned in the backend's default order.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a new document, letting the backend assign its identifier.
    ///
    /// The collection is created on first use.
    ///
    /// # Returns
    ///
    /// The identifier assigned to the new document.
    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> DocumentStoreResult<String>;

    /// Inserts a new document under an explicit identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if a document with that identifier is already present.
    async fn create_document(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> DocumentStoreResult<()>;

    /// Replaces the whole field mapping stored at `id`.
    ///
    /// This is a full overwrite: fields absent from `fields` are removed from the stored
    /// document. If no document exists at `id`, one is created.
    async fn set_document(
        &self,
        collection: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> DocumentStoreResult<()>;

    /// Deletes the document at `id`.
    ///
    /// Deleting a document that does not exist succeeds.
    async fn delete_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<()>;

    /// Retrieves the document at `id`, or `None` if it does not exist.
    async fn get_document(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> DocumentStoreResult<Option<StoredDocument>>;

    /// Runs a query against the collection named in `query`.
    ///
    /// # See Also
    ///
    /// - [`Query`] for constructing queries
    /// - [`crate::query::Filter`] for building filter clauses
    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<StoredDocument>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
