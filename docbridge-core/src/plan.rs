//! Declarative collection reads and their translation into executable plans.
//!
//! A [`CollectionRequest`] is what a client sends: a collection name, filter clauses,
//! sort clauses and sub-collection names, all optional except the collection. Turning it
//! into a [`ReadPlan`] validates every clause and keeps their order; no backend is
//! contacted until the plan exists.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::value_from_json,
    query::{CollectionPath, ComparisonOp, FieldFilter, Query, QueryError, SortDirection},
};

/// A client-supplied filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterClause {
    /// Field to compare.
    pub key: String,
    /// Operator spelling (`==`, `!=`, `>`, `<`, `>=`, `<=`).
    ///
    /// Older clients send this as `compression`.
    #[serde(alias = "compression")]
    pub operator: String,
    /// Value to compare against. `null` is a legitimate value.
    pub value: Value,
}

/// A client-supplied sort clause. Descending unless `asc` is `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortClause {
    /// Field to sort by.
    pub key: String,
    /// Sort ascending when `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asc: Option<bool>,
}

impl SortClause {
    /// Resolves the direction, defaulting to descending.
    pub fn direction(&self) -> SortDirection {
        match self.asc {
            Some(true) => SortDirection::Asc,
            _ => SortDirection::default(),
        }
    }
}

/// A declarative read of one collection and, optionally, nested sub-collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionRequest {
    /// Collection path to read.
    #[serde(default)]
    pub collection_name: Option<String>,
    /// Filter clauses, ANDed in order.
    #[serde(default)]
    pub queries: Option<Vec<FilterClause>>,
    /// Sort clauses, applied as a tie-break chain in order.
    #[serde(default)]
    pub order_by_keys: Option<Vec<SortClause>>,
    /// Sub-collections to attach to every result document.
    #[serde(default)]
    pub sub_collections: Option<Vec<String>>,
}

/// The validated, executable form of a [`CollectionRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPlan {
    /// The primary query.
    pub query: Query,
    /// Sub-collection names to fetch under each result document, in request order.
    pub sub_collections: Vec<String>,
}

impl ReadPlan {
    /// Validates `request` and builds the plan.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] for a missing or malformed collection, an empty filter or
    /// sort field, an unrecognized operator, an unconvertible value, or a malformed
    /// sub-collection name.
    pub fn build(request: CollectionRequest) -> Result<Self, QueryError> {
        let collection = match request.collection_name.as_deref() {
            Some(name) => CollectionPath::parse(name)?,
            None => return Err(QueryError::MissingCollection),
        };

        let mut builder = Query::builder(collection);

        for (index, clause) in request.queries.unwrap_or_default().into_iter().enumerate() {
            builder = builder.filter(Self::filter(index, clause)?);
        }

        for (index, clause) in request.order_by_keys.unwrap_or_default().into_iter().enumerate() {
            if clause.key.trim().is_empty() {
                return Err(QueryError::MissingSortField(index));
            }

            let direction = clause.direction();
            builder = builder.sort(clause.key, direction);
        }

        let sub_collections = request.sub_collections.unwrap_or_default();

        for (index, name) in sub_collections.iter().enumerate() {
            if name.trim().is_empty() || name.contains('/') {
                return Err(QueryError::InvalidSubCollection(index));
            }
        }

        Ok(ReadPlan {
            query: builder.build(),
            sub_collections,
        })
    }

    fn filter(index: usize, clause: FilterClause) -> Result<FieldFilter, QueryError> {
        if clause.key.trim().is_empty() {
            return Err(QueryError::MissingField(index));
        }

        let op = clause
            .operator
            .parse::<ComparisonOp>()
            .map_err(|operator| QueryError::UnknownOperator { index, operator })?;
        let value = value_from_json(&clause.value)
            .map_err(|e| QueryError::InvalidValue(index, e.to_string()))?;

        Ok(FieldFilter::new(clause.key, op, value))
    }
}

impl TryFrom<CollectionRequest> for ReadPlan {
    type Error = QueryError;

    fn try_from(request: CollectionRequest) -> Result<Self, Self::Error> {
        ReadPlan::build(request)
    }
}
