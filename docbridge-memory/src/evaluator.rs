//! Filter evaluation and sort comparison for in-memory documents.
//!
//! Filters follow the semantics of managed document databases:
//!
//! - a clause never matches a document that lacks the field (`!=` included);
//! - range operators only match values of the same kind (numbers with numbers, strings
//!   with strings, ...);
//! - integers and floats compare numerically; integers compare exactly, also beyond 2^53.
//!
//! Field names may be dotted paths (`address.city`) reaching into nested maps.

use std::cmp::Ordering;

use bson::{Bson, datetime::DateTime};

use docbridge_core::{
    document::Fields,
    error::DocumentStoreError,
    query::{ComparisonOp, FieldFilter, QueryVisitor, Sort, SortDirection},
};

/// Type-erased, comparable representation of BSON values.
///
/// Int32 and Int64 share the `Int` variant; ints and doubles compare without rounding.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    Bytes(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Other,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            _ => Comparable::Other,
        }
    }
}

impl Comparable<'_> {
    /// Rank of the value's kind in the cross-kind sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Int(_) | Comparable::Double(_) => 2,
            Comparable::DateTime(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Bytes(_) => 5,
            Comparable::Array(_) => 6,
            Comparable::Map(_) => 7,
            Comparable::Other => 8,
        }
    }

    /// Total order used for sorting: values of different kinds order by kind, values of
    /// the same kind by value.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.cmp(b),
            (Comparable::Double(a), Comparable::Double(b)) => a.total_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => cmp_int_double(*a, *b).unwrap_or(Ordering::Less),
            (Comparable::Double(a), Comparable::Int(b)) => cmp_int_double(*b, *a)
                .map(Ordering::reverse)
                .unwrap_or(Ordering::Greater),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.total_cmp(vb)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::Int(a), Comparable::Double(b)) | (Comparable::Double(b), Comparable::Int(a)) => {
                cmp_int_double(*a, *b) == Some(Ordering::Equal)
            },
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter().any(|(other_key, other_value)| key == other_key && value == other_value)
                    })
            },
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => Some(a.cmp(b)),
            (Comparable::Double(a), Comparable::Double(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => cmp_int_double(*a, *b),
            (Comparable::Double(a), Comparable::Int(b)) => cmp_int_double(*b, *a).map(Ordering::reverse),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compares an integer with a double exactly. `None` when the double is NaN.
fn cmp_int_double(int: i64, double: f64) -> Option<Ordering> {
    // 2^63, exactly representable as a double.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() {
        return None;
    }
    if double >= BOUND {
        return Some(Ordering::Less);
    }
    if double < -BOUND {
        return Some(Ordering::Greater);
    }

    let whole = double.trunc();
    let fraction = double - whole;

    Some(int.cmp(&(whole as i64)).then_with(|| {
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }))
}

/// Resolves a possibly dotted field path inside `fields`.
pub(crate) fn lookup<'a>(fields: &'a Fields, path: &str) -> Option<&'a Bson> {
    if let Some(value) = fields.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Compares two documents along a sort chain. Earlier clauses take priority.
pub(crate) fn compare_by(left: &Fields, right: &Fields, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let a = lookup(left, &sort.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let b = lookup(right, &sort.field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        let ordering = match sort.direction {
            SortDirection::Asc => a.total_cmp(&b),
            SortDirection::Desc => b.total_cmp(&a),
        };

        if ordering.is_ne() {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Evaluates filter clauses against a single document.
pub(crate) struct DocumentEvaluator<'a> {
    fields: &'a Fields,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(fields: &'a Fields) -> Self {
        Self { fields }
    }

    pub fn matches(fields: &'a Fields, filters: &[FieldFilter]) -> Result<bool, DocumentStoreError> {
        DocumentEvaluator::new(fields).visit_all(filters)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_all(&mut self, filters: &[FieldFilter]) -> Result<Self::Output, Self::Error> {
        for filter in filters {
            if !self.visit_filter(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_field(&mut self, field: &str, op: &ComparisonOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.fields, field) else {
            return Ok(false);
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            ComparisonOp::Eq => left == right,
            ComparisonOp::Ne => left != right,
            ComparisonOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            ComparisonOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            ComparisonOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            ComparisonOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
        })
    }
}
