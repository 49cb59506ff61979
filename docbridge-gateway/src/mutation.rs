//! Mutation Gateway: create, full-replace update and delete of single documents.
//!
//! The `id` key of a submitted object addresses the document and is never written as a
//! field.

use serde_json::{Map, Value};

use docbridge::{
    document::{ID_FIELD, fields_from_json},
    query::CollectionPath,
    store::DocumentStore,
};

use crate::{
    deadline::Deadline,
    error::{ApiError, ApiResult},
    reader::JsonDocument,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub id: String,
    pub message: String,
    /// The submitted object with the identifier attached.
    pub data: JsonDocument,
}

#[derive(Debug, Clone)]
pub struct MutationGateway {
    store: DocumentStore,
    deadline: Deadline,
}

impl MutationGateway {
    pub fn new(store: DocumentStore, deadline: Deadline) -> Self {
        Self { store, deadline }
    }

    /// Adds a document under a store-assigned identifier.
    pub async fn create(&self, collection: &CollectionPath, object: Option<Value>) -> ApiResult<MutationOutcome> {
        let mut data = require_object(object)?;
        let fields = to_fields(without_id(&data))?;

        let id = self
            .deadline
            .run(self.store.collection(collection.clone()).add(fields))
            .await?;

        data.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        tracing::info!(collection = %collection, id = %id, "document created");

        Ok(MutationOutcome {
            message: format!("Object was created with ID: {id}"),
            id,
            data,
        })
    }

    /// Replaces every non-identifier field of the addressed document, creating it when absent.
    pub async fn update(&self, collection: &CollectionPath, object: Option<Value>) -> ApiResult<MutationOutcome> {
        let data = require_object(object)?;
        let id = require_id(&data)?;
        let fields = to_fields(without_id(&data))?;

        self.deadline
            .run(self.store.collection(collection.clone()).set(&id, fields))
            .await?;

        tracing::info!(collection = %collection, id = %id, "document replaced");

        Ok(MutationOutcome {
            message: format!("Object with ID: {id} was updated"),
            id,
            data,
        })
    }

    /// Removes the addressed document. Removing an absent document succeeds.
    pub async fn delete(&self, collection: &CollectionPath, object: Option<Value>) -> ApiResult<MutationOutcome> {
        let data = require_object(object)?;
        let id = require_id(&data)?;

        self.deadline
            .run(self.store.collection(collection.clone()).delete(&id))
            .await?;

        tracing::info!(collection = %collection, id = %id, "document deleted");

        Ok(MutationOutcome {
            message: format!("Object with ID: {id} was deleted"),
            id,
            data,
        })
    }
}

fn require_object(object: Option<Value>) -> ApiResult<Map<String, Value>> {
    match object {
        Some(Value::Object(map)) => Ok(map),
        None | Some(Value::Null) => Err(ApiError::validation("\"objectData\" is required")),
        Some(_) => Err(ApiError::validation("\"objectData\" must be of type object")),
    }
}

fn require_id(object: &Map<String, Value>) -> ApiResult<String> {
    match object.get(ID_FIELD) {
        Some(Value::String(id)) if !id.trim().is_empty() && !id.contains('/') => Ok(id.clone()),
        Some(Value::String(_)) => Err(ApiError::validation(
            "\"objectData.id\" must be a single non-empty path segment",
        )),
        Some(_) => Err(ApiError::validation("\"objectData.id\" must be a string")),
        None => Err(ApiError::validation("\"objectData.id\" is required")),
    }
}

fn without_id(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .filter(|(key, _)| key.as_str() != ID_FIELD)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn to_fields(object: Map<String, Value>) -> ApiResult<docbridge::document::Fields> {
    fields_from_json(object)
        .map_err(|e| ApiError::validation(format!("\"objectData\" could not be converted: {e}")))
}
