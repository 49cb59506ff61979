//! Error types and result types for document store operations.
//!
//! This module provides error handling for every call made against a store backend.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//!
//! Each variant maps to a stable, lowercase error code (see [`DocumentStoreError::code`])
//! which the HTTP layer surfaces verbatim to callers.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection path.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection path.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The request was rejected by the store as malformed (bad path, bad filter value).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The document violates schema constraints or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns the stable error code for this error.
    ///
    /// Codes follow the vocabulary of managed document databases (`not-found`,
    /// `already-exists`, `invalid-argument`, ...), so that clients written against
    /// such a database keep working when pointed at this facade.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentStoreError::Serialization(_) => "data-loss",
            DocumentStoreError::Initialization(_) => "failed-precondition",
            DocumentStoreError::DocumentAlreadyExists(..) => "already-exists",
            DocumentStoreError::DocumentNotFound(..) => "not-found",
            DocumentStoreError::InvalidArgument(_) => "invalid-argument",
            DocumentStoreError::InvalidDocument(_) => "invalid-argument",
            DocumentStoreError::Unavailable(_) => "unavailable",
            DocumentStoreError::Backend(_) => "internal",
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
