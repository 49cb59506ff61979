//! Query construction for document stores.
//!
//! This module provides the executable query description handed to a
//! [`StoreBackend`](crate::backend::StoreBackend): the collection being read, an ordered
//! list of filter clauses (evaluated as a logical AND) and an ordered list of sort clauses
//! (applied as a tie-break chain). Clause order is never changed once a clause has been
//! added; backends with composite-index requirements rely on it.
//!
//! # Query Building
//!
//! ```ignore
//! use docbridge::query::{CollectionPath, Filter, Query, SortDirection};
//!
//! let query = Query::builder(CollectionPath::parse("users")?)
//!     .filter(Filter::eq("status", "active"))
//!     .filter(Filter::gte("age", 18))
//!     .sort("created_at", SortDirection::Desc)
//!     .build();
//! ```
//!
//! # Translating queries
//!
//! Backends walk the filter clauses with a [`QueryVisitor`], producing whatever their
//! native representation is (a BSON filter document, a predicate result, ...).

use std::{fmt, str::FromStr};

use bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DocumentStoreError;

/// Errors raised while building a query, before anything reaches a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No collection reference was supplied.
    #[error("\"collectionName\" is required")]
    MissingCollection,
    /// The collection reference is not a valid collection path.
    #[error("\"collectionName\" is not a valid collection path: {0}")]
    InvalidCollection(String),
    /// A filter clause has an empty field name.
    #[error("\"queries[{0}].key\" is not allowed to be empty")]
    MissingField(usize),
    /// A filter clause uses an operator outside the recognized set.
    #[error("\"queries[{index}].operator\" must be one of [==, !=, >, <, >=, <=], got {operator:?}")]
    UnknownOperator {
        /// Position of the offending clause.
        index: usize,
        /// The operator as supplied.
        operator: String,
    },
    /// A sort clause has an empty field name.
    #[error("\"orderByKeys[{0}].key\" is not allowed to be empty")]
    MissingSortField(usize),
    /// A sub-collection name is empty or contains a path separator.
    #[error("\"subCollections[{0}]\" must be a single non-empty path segment")]
    InvalidSubCollection(usize),
    /// A filter value cannot be represented in the store's value model.
    #[error("\"queries[{0}].value\" could not be converted: {1}")]
    InvalidValue(usize, String),
}

/// A validated reference to a top-level or nested collection.
///
/// Collection paths alternate collection and document segments, so a valid path always
/// has an odd number of non-empty `/`-separated segments: `users`,
/// `users/abc/orders`, ... Nested collections are only ever reached through their parent
/// document, see [`CollectionPath::sub_collection`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parses and validates a collection path.
    pub fn parse(path: &str) -> Result<Self, QueryError> {
        let trimmed = path.trim_matches('/');

        if trimmed.is_empty() {
            return Err(QueryError::MissingCollection);
        }

        let segments = trimmed.split('/').collect::<Vec<_>>();

        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(QueryError::InvalidCollection(format!(
                "{path:?} contains an empty segment"
            )));
        }
        if segments.len() % 2 == 0 {
            return Err(QueryError::InvalidCollection(format!(
                "{path:?} addresses a document, not a collection"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the path of the collection `name` nested under document `document_id`
    /// of this collection.
    pub fn sub_collection(&self, document_id: &str, name: &str) -> Result<Self, QueryError> {
        for segment in [document_id, name] {
            if segment.trim().is_empty() || segment.contains('/') {
                return Err(QueryError::InvalidCollection(format!(
                    "{segment:?} is not a single path segment"
                )));
            }
        }

        Ok(Self(format!("{}/{}/{}", self.0, document_id, name)))
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last segment of the path (the collection's own name).
    pub fn name(&self) -> &str {
        self.0
            .rsplit('/')
            .next()
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CollectionPath {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Sort direction for query results.
///
/// The default is [`SortDirection::Desc`]: a sort clause that does not name a
/// direction sorts descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    #[default]
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Equal to (exact match).
    #[serde(rename = "==")]
    Eq,
    /// Not equal to.
    #[serde(rename = "!=")]
    Ne,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Greater than or equal to.
    #[serde(rename = ">=")]
    Gte,
    /// Less than or equal to.
    #[serde(rename = "<=")]
    Lte,
}

impl ComparisonOp {
    /// All recognized operators, in their canonical order.
    pub const ALL: [ComparisonOp; 6] = [
        ComparisonOp::Eq,
        ComparisonOp::Ne,
        ComparisonOp::Gt,
        ComparisonOp::Lt,
        ComparisonOp::Gte,
        ComparisonOp::Lte,
    ];

    /// Returns the wire spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lte => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComparisonOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A single filter clause: `field <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// The field name to compare.
    pub field: String,
    /// The comparison operator.
    pub op: ComparisonOp,
    /// The value to compare against.
    pub value: Bson,
}

impl FieldFilter {
    /// Creates a filter clause.
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: impl Into<Bson>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }
}

/// Helper struct for constructing filter clauses.
///
/// # Example
///
/// ```ignore
/// use docbridge::query::Filter;
///
/// let adults = Filter::gte("age", 18);
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter::new(field, ComparisonOp::Eq, value)
    }

    /// Matches documents where the field does not equal the specified value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter::new(field, ComparisonOp::Ne, value)
    }

    /// Matches documents where the field is greater than the specified value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter::new(field, ComparisonOp::Gt, value)
    }

    /// Matches documents where the field is greater than or equal to the specified value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter::new(field, ComparisonOp::Gte, value)
    }

    /// Matches documents where the field is less than the specified value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter::new(field, ComparisonOp::Lt, value)
    }

    /// Matches documents where the field is less than or equal to the specified value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> FieldFilter {
        FieldFilter::new(field, ComparisonOp::Lte, value)
    }
}

/// An executable read against one collection.
///
/// Use [`QueryBuilder`] for ergonomic construction. A query with neither filters nor
/// sorts is an unconstrained scan of the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The collection being read.
    pub collection: CollectionPath,
    /// Filter clauses, ANDed, in caller order.
    pub filters: Vec<FieldFilter>,
    /// Sort clauses, applied as a tie-break chain in caller order.
    pub sorts: Vec<Sort>,
}

impl Query {
    /// Creates an unconstrained scan of `collection`.
    pub fn scan(collection: CollectionPath) -> Self {
        Query {
            collection,
            filters: Vec::new(),
            sorts: Vec::new(),
        }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder(collection: CollectionPath) -> QueryBuilder {
        QueryBuilder::new(collection)
    }

    /// Returns `true` when the query neither filters nor sorts.
    pub fn is_unconstrained(&self) -> bool {
        self.filters.is_empty() && self.sorts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder reading from `collection`.
    pub fn new(collection: CollectionPath) -> Self {
        QueryBuilder { query: Query::scan(collection) }
    }

    /// Appends a filter clause after any clause already added.
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.query.filters.push(filter);
        self
    }

    /// Appends a sort clause after any clause already added.
    ///
    /// # Arguments
    ///
    /// * `field` - The field name to sort by
    /// * `direction` - The sort direction (ascending or descending)
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sorts.push(Sort { field: field.into(), direction });
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks the filter clauses of a query.
///
/// Backends implement [`QueryVisitor::visit_field`] for a single clause and
/// [`QueryVisitor::visit_all`] to combine the per-clause outputs as a logical AND.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_all(&mut self, filters: &[FieldFilter]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &ComparisonOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_filter(&mut self, filter: &FieldFilter) -> Result<Self::Output, Self::Error> {
        self.visit_field(&filter.field, &filter.op, &filter.value)
    }
}
