//! Convenient re-exports of commonly used types from docbridge.
//!
//! ```ignore
//! use docbridge::prelude::*;
//! ```

pub use docbridge_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    blob::{BlobStorage, BlobStoreError, FileUrl, StoredObject},
    collection::{Collection, TypedCollection},
    document::{Document, DocumentExt, Fields, StoredDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    identity::{IdentityError, IdentityProvider, SessionClaims, SignedInUser, UserRecord, UserUpdate},
    plan::{CollectionRequest, FilterClause, ReadPlan, SortClause},
    query::{CollectionPath, ComparisonOp, FieldFilter, Filter, Query, QueryBuilder, QueryError, QueryVisitor, Sort, SortDirection},
    store::DocumentStore,
};
