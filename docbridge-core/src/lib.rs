//! Core abstractions behind the docbridge HTTP facade.
//!
//! This crate defines everything the gateway talks to, without committing to any
//! particular vendor:
//!
//! - **Documents** ([`document`]) - Field mappings, identifiers and JSON conversion
//! - **Store backend abstraction** ([`backend`]) - The trait document databases implement
//! - **Queries** ([`query`]) - Collection paths, comparison filters and sort chains
//! - **Read plans** ([`plan`]) - Validation of declarative client reads into queries
//! - **Collections interface** ([`collection`]) - High-level API over a single collection
//! - **Document store** ([`store`]) - Shared handle to a backend
//! - **Identity** ([`identity`]) - The identity provider contract and its records
//! - **Blob storage** ([`blob`]) - Binary object storage and public file URLs
//! - **Error handling** ([`error`]) - Document store errors and their stable codes
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{Document, DocumentStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Profile {
//!     pub id: String,
//!     pub email: String,
//! }
//!
//! impl Document for Profile {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//! ```

pub mod backend;
pub mod blob;
pub mod collection;
pub mod document;
pub mod error;
pub mod identity;
pub mod plan;
pub mod query;
pub mod store;
