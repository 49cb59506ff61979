//! HTTP facade over a document store, an identity provider and blob storage.
//!
//! - [`reader`] - declarative collection reads with nested sub-collections
//! - [`mutation`] - single-document create, full-replace update and delete
//! - [`credentials`] - password sign-in/sign-up traded for session cookies
//! - [`revocation`] - sign-out by revoking every token of the session's owner
//! - [`files`] - uploads and deletions addressed by download URLs
//! - [`http`] - the axum router tying them together
//!
//! Every collaborator is reached through a trait object handed in at construction, so
//! the in-memory implementations from [`docbridge::memory`] can stand in for real ones.

pub mod config;
pub mod credentials;
pub mod deadline;
pub mod error;
pub mod files;
pub mod http;
pub mod mutation;
pub mod rate_limit;
pub mod reader;
pub mod revocation;
