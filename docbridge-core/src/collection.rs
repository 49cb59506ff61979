//! Collection handles for document store operations.
//!
//! This module provides collection abstractions bound to a store backend:
//!
//! - [`Collection`] - Untyped collection working on raw field mappings
//! - [`TypedCollection`] - Type-safe collection for a specific [`Document`] type
//!
//! # Example
//!
//! ```ignore
//! let users = store.collection(CollectionPath::parse("users")?);
//! let id = users.add(doc! { "name": "Alice" }).await?;
//! let alice = users.get(&id).await?;
//! ```

use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt, Fields, StoredDocument},
    error::DocumentStoreResult,
    query::{CollectionPath, Query},
};

/// An untyped collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a> {
    path: CollectionPath,
    backend: &'a dyn StoreBackend,
}

impl<'a> Collection<'a> {
    /// Creates a new collection reference (internal use).
    pub(crate) fn new(path: CollectionPath, backend: &'a dyn StoreBackend) -> Self {
        Self { path, backend }
    }

    /// Returns the path of this collection.
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Inserts a new document and returns the identifier the backend assigned.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn add(&self, fields: Fields) -> DocumentStoreResult<String> {
        self.backend
            .add_document(&self.path, fields)
            .await
    }

    /// Inserts a new document under `id`, failing if one already exists.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn create(&self, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        self.backend
            .create_document(&self.path, id, fields)
            .await
    }

    /// Replaces every field of the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn set(&self, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        self.backend
            .set_document(&self.path, id, fields)
            .await
    }

    /// Deletes the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn delete(&self, id: &str) -> DocumentStoreResult<()> {
        self.backend
            .delete_document(&self.path, id)
            .await
    }

    /// Retrieves the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn get(&self, id: &str) -> DocumentStoreResult<Option<StoredDocument>> {
        self.backend
            .get_document(&self.path, id)
            .await
    }

    /// Reads every document of the collection, unfiltered and unsorted.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn scan(&self) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.backend
            .query_documents(&Query::scan(self.path.clone()))
            .await
    }
}

/// A typed collection for documents of type `D`.
#[derive(Debug)]
pub struct TypedCollection<'a, D: Document> {
    inner: Collection<'a>,
    _marker: PhantomData<D>,
}

impl<'a, D: Document> TypedCollection<'a, D> {
    pub(crate) fn new(path: CollectionPath, backend: &'a dyn StoreBackend) -> Self {
        Self {
            inner: Collection::new(path, backend),
            _marker: PhantomData,
        }
    }

    /// Returns the path of this collection.
    pub fn path(&self) -> &CollectionPath {
        self.inner.path()
    }

    /// Inserts `document` under its own identifier, failing if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the document already exists.
    pub async fn create(&self, document: &D) -> DocumentStoreResult<()> {
        self.inner
            .create(document.id(), document.to_fields()?)
            .await
    }

    /// Retrieves the document at `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored fields do not match `D`.
    pub async fn get(&self, id: &str) -> DocumentStoreResult<Option<D>> {
        self.inner
            .get(id)
            .await?
            .map(D::from_stored)
            .transpose()
    }
}
