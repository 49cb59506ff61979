//! Query translation from docbridge queries to MongoDB query syntax.
//!
//! Filters become a BSON filter document; sort chains become an ordered sort document.
//! Every clause also requires the field to exist, so that `!=` and `== null` never match
//! documents lacking the field, as in the in-memory backend.

use bson::{Bson, Document, doc};

use docbridge_core::{
    error::DocumentStoreError,
    query::{ComparisonOp, FieldFilter, QueryVisitor, Sort, SortDirection},
};

use crate::sanitizer::ValueSanitizer;

/// Translates docbridge filter clauses into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_all(&mut self, filters: &[FieldFilter]) -> Result<Self::Output, Self::Error> {
        let mut clauses = filters
            .iter()
            .map(|filter| self.visit_filter(filter))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match clauses.len() {
            0 => doc! {},
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        })
    }

    fn visit_field(&mut self, field: &str, op: &ComparisonOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            ComparisonOp::Eq => "$eq",
            ComparisonOp::Ne => "$ne",
            ComparisonOp::Gt => "$gt",
            ComparisonOp::Gte => "$gte",
            ComparisonOp::Lt => "$lt",
            ComparisonOp::Lte => "$lte",
        };

        let path = ValueSanitizer::sanitize_path(field);

        Ok(doc! {
            path: {
                "$exists": true,
                operator: value.clone(),
            }
        })
    }
}

/// Builds the sort document for a sort chain.
///
/// Keys keep their clause order. The identifier is appended as the final tie-break, so
/// that ties (and unsorted reads) come back in identifier order.
pub(crate) fn sort_document(sorts: &[Sort]) -> Document {
    let mut document = Document::new();

    for sort in sorts {
        let path = ValueSanitizer::sanitize_path(&sort.field);

        if !document.contains_key(&path) {
            document.insert(
                path,
                match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                },
            );
        }
    }

    if !document.contains_key("_id") {
        document.insert("_id", 1);
    }

    document
}

#[cfg(test)]
mod tests {
    use docbridge_core::query::Filter;

    use super::*;

    #[test]
    fn no_filters_match_everything() {
        assert_eq!(MongoQueryTranslator.visit_all(&[]).unwrap(), doc! {});
    }

    #[test]
    fn single_clause_is_not_wrapped() {
        assert_eq!(
            MongoQueryTranslator.visit_all(&[Filter::ne("role", "admin")]).unwrap(),
            doc! { "role": { "$exists": true, "$ne": "admin" } }
        );
    }

    #[test]
    fn clauses_are_anded_in_order() {
        let filter = MongoQueryTranslator
            .visit_all(&[Filter::gt("stock", 0), Filter::lte("price", 30.5)])
            .unwrap();

        assert_eq!(
            filter,
            doc! {
                "$and": [
                    { "stock": { "$exists": true, "$gt": 0 } },
                    { "price": { "$exists": true, "$lte": 30.5 } },
                ]
            }
        );
    }

    #[test]
    fn sort_documents_keep_clause_order_and_end_with_the_identifier() {
        let sorts = [
            Sort { field: "price".into(), direction: SortDirection::Asc },
            Sort { field: "a.b".into(), direction: SortDirection::Desc },
        ];
        let document = sort_document(&sorts);

        assert_eq!(document, doc! { "price": 1, "a.b": -1, "_id": 1 });
        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            ["price", "a.b", "_id"]
        );
        assert_eq!(sort_document(&[]), doc! { "_id": 1 });
    }
}
