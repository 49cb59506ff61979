//! In-memory collaborators for docbridge.
//!
//! This crate provides thread-safe, in-memory implementations of every collaborator the
//! gateway talks to. They use async-aware read-write locks for concurrent access and are
//! meant for development, testing and single-process deployments.
//!
//! - [`InMemoryStore`] - a [`StoreBackend`](docbridge_core::backend::StoreBackend) with
//!   nested collections, filters and multi-key sorts
//! - [`InMemoryIdentityProvider`] - email/password accounts, session cookies and
//!   revocation
//! - [`InMemoryBlobStorage`] - a single-bucket object store
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{DocumentStore, memory::InMemoryStore};
//! use docbridge::query::CollectionPath;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let users = store.collection(CollectionPath::parse("users")?);
//!
//!     let id = users.add(doc! { "name": "Alice" }).await?;
//!     assert!(users.get(&id).await?.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod evaluator;
pub mod identity;
pub mod store;

pub use blob::InMemoryBlobStorage;
pub use identity::InMemoryIdentityProvider;
pub use store::{InMemoryStore, InMemoryStoreBuilder};
