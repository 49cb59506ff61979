//! In-memory storage implementation for document stores.
//!
//! Documents are kept per collection path in ordered maps keyed by identifier, behind an
//! async-aware read-write lock. Ordering by identifier is the store's default order; sort
//! clauses are applied with a stable sort on top of it.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use uuid::Uuid;

use docbridge_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{Fields, StoredDocument, check_document_id, strip_id},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{CollectionPath, Query},
};

use crate::evaluator::{DocumentEvaluator, compare_by};

type CollectionMap = BTreeMap<String, Fields>;
type StoreMap = HashMap<CollectionPath, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to
/// be shared across async tasks. Clones share the same underlying data.
///
/// Queries scan every document of the collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryStore;
/// use docbridge::backend::StoreBackend;
/// use docbridge::query::{CollectionPath, Query};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let users = CollectionPath::parse("users")?;
///
/// let id = store.add_document(&users, doc! { "name": "Alice", "age": 30 }).await?;
/// let docs = store.query_documents(&Query::scan(users)).await?;
/// assert_eq!(docs[0].id, id);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection path -> (document id -> fields)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns the number of documents stored in `collection`.
    pub async fn len(&self, collection: &CollectionPath) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn add_document(&self, collection: &CollectionPath, fields: Fields) -> DocumentStoreResult<String> {
        let (_, fields) = strip_id(fields);
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.clone())
            .or_default();

        let id = loop {
            let candidate = Uuid::new_v4().simple().to_string();

            if !collection_map.contains_key(&candidate) {
                break candidate;
            }
        };

        collection_map.insert(id.clone(), fields);

        Ok(id)
    }

    async fn create_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        check_document_id(collection, id)?;

        let (_, fields) = strip_id(fields);
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.clone())
            .or_default();

        if collection_map.contains_key(id) {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
        }

        collection_map.insert(id.to_string(), fields);

        Ok(())
    }

    async fn set_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        check_document_id(collection, id)?;

        let (_, fields) = strip_id(fields);

        self.store
            .write()
            .await
            .entry(collection.clone())
            .or_default()
            .insert(id.to_string(), fields);

        Ok(())
    }

    async fn delete_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<()> {
        check_document_id(collection, id)?;

        if let Some(collection_map) = self.store.write().await.get_mut(collection) {
            collection_map.remove(id);
        }

        Ok(())
    }

    async fn get_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<Option<StoredDocument>> {
        check_document_id(collection, id)?;

        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .and_then(|collection_map| collection_map.get(id))
                .map(|fields| StoredDocument::new(id, fields.clone()))
        )
    }

    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<StoredDocument>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(&query.collection) else {
            return Ok(vec![]);
        };

        let mut documents = Vec::new();

        for (id, fields) in collection_map {
            if DocumentEvaluator::matches(fields, &query.filters)? {
                documents.push(StoredDocument::new(id.clone(), fields.clone()));
            }
        }

        if !query.sorts.is_empty() {
            documents.sort_by(|a, b| compare_by(&a.fields, &b.fields, &query.sorts));
        }

        Ok(documents)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    seed: Vec<(CollectionPath, String, Fields)>,
}

impl InMemoryStoreBuilder {
    /// Stores `fields` under `id` in `collection` when the store is built.
    pub fn with_document(mut self, collection: CollectionPath, id: impl Into<String>, fields: Fields) -> Self {
        self.seed.push((collection, id.into(), fields));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore::new();

        for (collection, id, fields) in self.seed {
            store.set_document(&collection, &id, fields).await?;
        }

        Ok(store)
    }
}
