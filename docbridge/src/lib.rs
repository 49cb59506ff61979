//! Main docbridge crate providing a unified interface to the facade's collaborators.
//!
//! This crate re-exports the core abstractions and the available backends, so that
//! applications (the gateway included) depend on a single crate.
//!
//! # Features
//!
//! - **Document storage** - String-identified documents in nested collections
//! - **Declarative reads** - Validated filter/sort plans with clause order preserved
//! - **Identity and blobs** - Provider-neutral traits for accounts, sessions and files
//! - **Multiple backends** - In-memory collaborators and a MongoDB document store
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Profile {
//!     pub id: String,
//!     pub role: String,
//! }
//!
//! impl Document for Profile {
//!     fn id(&self) -> &str { &self.id }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
//!     let profiles = store.typed_collection::<Profile>().unwrap();
//!
//!     profiles
//!         .create(&Profile { id: "u1".into(), role: "user".into() })
//!         .await
//!         .unwrap();
//!
//!     let admins = store
//!         .query(
//!             &Query::builder(profiles.path().clone())
//!                 .filter(Filter::eq("role", "admin"))
//!                 .build(),
//!         )
//!         .await
//!         .unwrap();
//!
//!     assert!(admins.is_empty());
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory collaborators for development and testing
//! - [`mongodb`] - Persistent MongoDB document store (requires `mongodb` feature)

pub mod prelude;

pub use docbridge_core::{backend, blob, collection, document, error, identity, plan, query, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory collaborator implementations.
pub mod memory {
    pub use docbridge_memory::{InMemoryBlobStorage, InMemoryIdentityProvider, InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbridge_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
