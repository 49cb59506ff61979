//! Core traits and types for document representation and serialization.
//!
//! A stored document is a field mapping plus a store-assigned identifier. The identifier
//! is never part of the stored mapping: it is attached as the [`ID_FIELD`] key only when
//! a document leaves the system ([`StoredDocument::into_payload`]) and removed again
//! before anything is written ([`strip_id`]).

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::CollectionPath,
};

/// The field mapping of a document, without its identifier.
pub type Fields = bson::Document;

/// Name of the key the identifier is exposed under at the output boundary.
pub const ID_FIELD: &str = "id";

/// Core trait for typed documents with a fixed home collection.
///
/// The identifier is part of the Rust type (so that a typed document can be written to
/// a known id) but is stripped from the stored fields on write.
///
/// # Example
///
/// ```ignore
/// use docbridge::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Team {
///     pub id: String,
///     pub name: String,
/// }
///
/// impl Document for Team {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "teams"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's identifier.
    fn id(&self) -> &str;

    /// Returns the path of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing conversions between typed documents and stored fields.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to its stored field mapping (identifier removed).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the document is not a map.
    fn to_fields(&self) -> DocumentStoreResult<Fields>;

    /// Rebuilds a typed document from a stored document, identifier included.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_stored(stored: StoredDocument) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_fields(&self) -> DocumentStoreResult<Fields> {
        match serialize_to_bson(self)? {
            Bson::Document(fields) => Ok(strip_id(fields).1),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    fn from_stored(stored: StoredDocument) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(stored.into_payload()))?)
    }
}

/// A document as returned by a store backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// The store-assigned identifier.
    pub id: String,
    /// The stored field mapping.
    pub fields: Fields,
}

impl StoredDocument {
    /// Creates a stored document.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }

    /// Returns the field mapping with the identifier merged in.
    ///
    /// The identifier wins over any stored field that happens to be named [`ID_FIELD`].
    pub fn into_payload(self) -> Fields {
        let mut payload = self.fields;
        payload.insert(ID_FIELD, Bson::String(self.id));
        payload
    }

    /// Returns the normalized payload as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored value has no JSON representation.
    pub fn into_json(self) -> DocumentStoreResult<Map<String, Value>> {
        fields_to_json(self.into_payload())
    }
}

/// Splits the identifier off a field mapping.
///
/// Returns the removed identifier value (if any) and the remaining fields.
pub fn strip_id(mut fields: Fields) -> (Option<Bson>, Fields) {
    let id = fields.remove(ID_FIELD);
    (id, fields)
}

/// Checks that `id` can address a document of `collection`: a single, non-empty path
/// segment.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidArgument`] otherwise.
pub fn check_document_id(collection: &CollectionPath, id: &str) -> DocumentStoreResult<()> {
    if id.trim().is_empty() || id.contains('/') {
        return Err(DocumentStoreError::InvalidArgument(format!(
            "{id:?} is not a valid document id in {collection}"
        )));
    }

    Ok(())
}

/// Converts a JSON object into a stored field mapping.
///
/// # Errors
///
/// Returns an error if a value cannot be represented (for example integers beyond the
/// signed 64-bit range).
pub fn fields_from_json(object: Map<String, Value>) -> DocumentStoreResult<Fields> {
    match serialize_to_bson(&Value::Object(object))? {
        Bson::Document(fields) => Ok(fields),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Converts a single JSON value into a BSON value.
///
/// # Errors
///
/// Returns an error if the value cannot be represented.
pub fn value_from_json(value: &Value) -> DocumentStoreResult<Bson> {
    Ok(serialize_to_bson(value)?)
}

/// Converts a stored field mapping into a JSON object.
///
/// # Errors
///
/// Returns an error if a value has no JSON representation.
pub fn fields_to_json(fields: Fields) -> DocumentStoreResult<Map<String, Value>> {
    Ok(deserialize_from_bson(Bson::Document(fields))?)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Team {
        id: String,
        name: String,
    }

    impl Document for Team {
        fn id(&self) -> &str {
            &self.id
        }

        fn collection_name() -> &'static str {
            "teams"
        }
    }

    #[test]
    fn identifier_overrides_stored_field() {
        let stored = StoredDocument::new("real", doc! { "id": "forged", "name": "a" });
        let payload = stored.into_payload();

        assert_eq!(payload.get_str("id").unwrap(), "real");
        assert_eq!(payload.get_str("name").unwrap(), "a");
    }

    #[test]
    fn typed_documents_store_without_identifier() {
        let team = Team { id: "t1".into(), name: "core".into() };
        let fields = team.to_fields().unwrap();

        assert!(!fields.contains_key(ID_FIELD));

        let back = Team::from_stored(StoredDocument::new("t1", fields)).unwrap();
        assert_eq!(back, team);
    }

    #[test]
    fn json_objects_convert_to_fields_and_back() {
        let object = json!({ "name": "a", "tags": ["x", "y"], "n": 3, "ok": true })
            .as_object()
            .cloned()
            .unwrap();
        let fields = fields_from_json(object.clone()).unwrap();
        let back = fields_to_json(fields).unwrap();

        assert_eq!(back, object);
    }
}
