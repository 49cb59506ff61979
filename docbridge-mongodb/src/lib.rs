//! MongoDB backend implementation for docbridge.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait,
//! enabling persistent document storage with filtering and sorting pushed down to
//! MongoDB's query engine.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Layout
//!
//! - Every collection path maps to one MongoDB collection; nested paths such as
//!   `users/u1/orders` are flattened into a single escaped collection name.
//! - Document identifiers are stored as string `_id`s and never appear in the fields.
//! - Field names containing `.`, `$` or NUL are escaped on write and restored on read.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "docbridge")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod query;
pub mod sanitizer;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
