//! Document store contract and query model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::errors::PersistenceError;
use crate::utils::parse_timestamp;

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first; missing values first.
    #[default]
    Ascending,
    /// Largest first; missing values last.
    Descending,
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Field name.
    pub field: String,
    /// Value the field must equal.
    pub value: Value,
}

impl FieldFilter {
    /// Creates an equality filter.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if `document` satisfies the filter.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

/// A collection-scoped query: filters, then a stable sort, then a limit.
///
/// Without `order_by`, documents come back in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Equality filters, all of which must match.
    pub filters: Vec<FieldFilter>,
    /// Optional ordering.
    pub order_by: Option<OrderBy>,
    /// Optional maximum number of results.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates an unfiltered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter::eq(field, value));
        self
    }

    /// Orders results by a field.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `document` satisfies every filter.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }

    /// Sorts and truncates already-filtered documents.
    #[must_use]
    pub fn finish(&self, mut documents: Vec<Value>) -> Vec<Value> {
        if let Some(order) = &self.order_by {
            documents.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }
        documents
    }
}

/// Orders two optional JSON field values.
///
/// Missing and `null` values sort before everything else. Strings that both
/// parse as RFC 3339 timestamps compare as instants, so differing
/// fractional-second precision does not break chronological order.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(tx), Some(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Storage contract for jobs, tasks and checkpoints.
///
/// Documents are JSON objects addressed by `(collection, id)`. No
/// cross-document transactions are assumed; every call is a single
/// self-contained read or write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or replaces a document.
    async fn set(&self, collection: &str, id: &str, document: Value)
        -> Result<(), PersistenceError>;

    /// Reads a document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, PersistenceError>;

    /// Merges top-level fields into an existing document.
    ///
    /// Fails with [`PersistenceError::MissingDocument`] if it does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), PersistenceError>;

    /// Runs a query; a missing collection yields no documents.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, PersistenceError>;

    /// Deletes every document matching all filters, returning the count.
    async fn delete_where(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, PersistenceError>;
}
