//! Collection Reader: executes read plans and materializes sub-collections.
//!
//! A plan's primary query runs first. Then, for every result document and every requested
//! sub-collection name, an unconstrained scan of `<collection>/<id>/<name>` runs, all of
//! them concurrently. Each scan is scoped under its own parent document. The first
//! failing scan aborts the whole read.

use futures::future::try_join_all;
use serde_json::{Map, Value};

use docbridge::{
    document::{ID_FIELD, StoredDocument, fields_to_json},
    plan::ReadPlan,
    query::{CollectionPath, Query},
    store::DocumentStore,
};

use crate::{
    deadline::Deadline,
    error::{ApiError, ApiResult},
};

/// A normalized document: stored fields, attached sub-collections and the `id` key.
pub type JsonDocument = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct CollectionReader {
    store: DocumentStore,
    deadline: Deadline,
}

impl CollectionReader {
    pub fn new(store: DocumentStore, deadline: Deadline) -> Self {
        Self { store, deadline }
    }

    /// Runs `plan`, returning documents in the order of the primary query.
    pub async fn read(&self, plan: &ReadPlan) -> ApiResult<Vec<JsonDocument>> {
        let collection = &plan.query.collection;
        let documents = self
            .deadline
            .run(self.store.query(&plan.query))
            .await?;

        let documents = try_join_all(
            documents
                .into_iter()
                .map(|document| self.materialize(collection, document, &plan.sub_collections)),
        )
        .await?;

        tracing::info!(
            collection = %collection,
            documents = documents.len(),
            sub_collections = plan.sub_collections.len(),
            "collection read"
        );

        Ok(documents)
    }

    /// Reads a single document, `None` when it does not exist.
    pub async fn read_one(&self, collection: &CollectionPath, id: &str) -> ApiResult<Option<JsonDocument>> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(ApiError::validation("\"docId\" must be a single non-empty path segment"));
        }

        let document = self
            .deadline
            .run(self.store.collection(collection.clone()).get(id))
            .await?;

        Ok(document
            .map(StoredDocument::into_json)
            .transpose()?)
    }

    async fn materialize(
        &self,
        collection: &CollectionPath,
        document: StoredDocument,
        sub_collections: &[String],
    ) -> ApiResult<JsonDocument> {
        let StoredDocument { id, fields } = document;
        let parent = id.as_str();

        let attached = try_join_all(sub_collections.iter().map(|name| async move {
            let path = collection.sub_collection(parent, name)?;
            let key = path.name().to_string();
            let children = self
                .deadline
                .run(self.store.query(&Query::scan(path)))
                .await?
                .into_iter()
                .map(|child| child.into_json().map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;

            Ok::<_, ApiError>((key, Value::Array(children)))
        }))
        .await?;

        let mut payload = fields_to_json(fields)?;
        payload.extend(attached);
        payload.insert(ID_FIELD.to_string(), Value::String(id));

        Ok(payload)
    }
}
