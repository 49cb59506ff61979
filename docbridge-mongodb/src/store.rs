use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::ClientOptions,
};
use uuid::Uuid;

use docbridge_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{Fields, StoredDocument, check_document_id, strip_id},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{CollectionPath, Query, QueryVisitor},
};

use crate::{
    query::{MongoQueryTranslator, sort_document},
    sanitizer::ValueSanitizer,
};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed [`StoreBackend`].
///
/// Each collection path maps to one MongoDB collection (nested paths are flattened, see
/// [`ValueSanitizer`]). Identifiers are stored as string `_id`s; a client field named
/// `_id` is shadowed by the identifier.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, path: &CollectionPath) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&ValueSanitizer::collection_name(path))
    }

    fn prepare_document(id: &str, fields: Fields) -> Document {
        let (_, fields) = strip_id(fields);
        let mut document = ValueSanitizer::sanitize_document(fields);

        document.insert("_id", id);
        document
    }

    fn restore_document(mut document: Document) -> DocumentStoreResult<StoredDocument> {
        let id = match document.remove("_id") {
            Some(Bson::String(id)) => id,
            Some(other) => other.to_string(),
            None => return Err(DocumentStoreError::InvalidDocument("document without _id".into())),
        };

        Ok(StoredDocument::new(id, ValueSanitizer::restore_document(document)))
    }
}

/// Maps a driver error onto the store's error vocabulary.
fn map_error(err: MongoError, collection: &CollectionPath, id: Option<&str>) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY => {
            DocumentStoreError::DocumentAlreadyExists(id.unwrap_or_default().to_string(), collection.to_string())
        },
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. } => {
            DocumentStoreError::Unavailable(err.to_string())
        },
        ErrorKind::InvalidArgument { .. } => DocumentStoreError::InvalidArgument(err.to_string()),
        _ => DocumentStoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn add_document(&self, collection: &CollectionPath, fields: Fields) -> DocumentStoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();

        self.get_collection(collection)
            .insert_one(Self::prepare_document(&id, fields))
            .await
            .map_err(|e| map_error(e, collection, Some(&id)))?;

        Ok(id)
    }

    async fn create_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        check_document_id(collection, id)?;

        self.get_collection(collection)
            .insert_one(Self::prepare_document(id, fields))
            .await
            .map_err(|e| map_error(e, collection, Some(id)))?;

        Ok(())
    }

    async fn set_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        check_document_id(collection, id)?;

        self.get_collection(collection)
            .replace_one(doc! { "_id": id }, Self::prepare_document(id, fields))
            .upsert(true)
            .await
            .map_err(|e| map_error(e, collection, Some(id)))?;

        Ok(())
    }

    async fn delete_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<()> {
        check_document_id(collection, id)?;

        self.get_collection(collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| map_error(e, collection, Some(id)))?;

        Ok(())
    }

    async fn get_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<Option<StoredDocument>> {
        check_document_id(collection, id)?;

        self.get_collection(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| map_error(e, collection, Some(id)))?
            .map(Self::restore_document)
            .transpose()
    }

    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.get_collection(&query.collection)
            .find(MongoQueryTranslator.visit_all(&query.filters)?)
            .sort(sort_document(&query.sorts))
            .await
            .map_err(|e| map_error(e, &query.collection, None))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| map_error(e, &query.collection, None))?
            .into_iter()
            .map(Self::restore_document)
            .collect()
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
