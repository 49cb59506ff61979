//! Key and collection name sanitization for MongoDB compatibility.
//!
//! MongoDB restricts field names (keys) from containing dots and dollar signs, which are
//! part of its query syntax, and collection names from containing dollar signs and null
//! bytes. Keys are escaped on the way in and restored on the way out; values are stored
//! untouched so that filters compare against exactly what the client sent.

use bson::{Bson, Document};

use docbridge_core::query::CollectionPath;

/// Sanitizes and restores document keys and collection names.
///
/// MongoDB does not allow field names (document keys) to contain:
/// - Dots (`.`) - used for nested field access in queries
/// - Dollar signs (`$`) - used for operators in queries
/// - Null bytes (`\0`) - field name terminators
pub(crate) struct ValueSanitizer;

impl ValueSanitizer {
    /// Character replacements for sanitization
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Separator between collection and document segments in nested collection names.
    const PATH_SEPARATOR: &'static str = "__slash__";

    /// Recursively sanitizes the keys of a document. Values are left as they are, apart
    /// from nested documents whose keys are sanitized in turn.
    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(k, v)| (Self::sanitize_string(&k), Self::sanitize_value(v)))
            .collect()
    }

    fn sanitize_value(value: Bson) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr
                    .into_iter()
                    .map(Self::sanitize_value)
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(Self::sanitize_document(doc)),
            other => other,
        }
    }

    /// Recursively restores the keys of a document, reverting [`Self::sanitize_document`].
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(k, v)| (Self::restore_string(&k), Self::restore_value(v)))
            .collect()
    }

    fn restore_value(value: Bson) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr
                    .into_iter()
                    .map(Self::restore_value)
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(Self::restore_document(doc)),
            other => other,
        }
    }

    /// Sanitizes a string by replacing problematic characters with safe escaped versions.
    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    /// Restores a string by reverting sanitization escapes.
    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }

    /// Sanitizes a dotted field path used in a filter or sort. Dots keep their meaning as
    /// nested-field separators; each segment is escaped on its own.
    pub(crate) fn sanitize_path(path: &str) -> String {
        path
            .split('.')
            .map(Self::sanitize_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Returns the MongoDB collection name backing a (possibly nested) collection path.
    pub(crate) fn collection_name(path: &CollectionPath) -> String {
        path
            .as_str()
            .split('/')
            .map(Self::sanitize_string)
            .collect::<Vec<_>>()
            .join(Self::PATH_SEPARATOR)
    }
}
