// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Queries against the authoritative document store.
//!
//! Resynchronisation never replays the realtime stream; it lists documents
//! again from the source of truth. A [`DocumentQuery`] names the collection
//! and a list of [`Query`] predicates: equality, null checks, ordering and a
//! row limit. Remote sources translate the query into their own API; the
//! in-memory evaluation in [`DocumentQuery::apply`] gives the reference
//! semantics (filters first, then orderings in declaration order, then limit).

use core::cmp::Ordering;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single predicate of a [`DocumentQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Query {
    Equal { attribute: String, value: Value },
    IsNull { attribute: String },
    OrderAsc { attribute: String },
    OrderDesc { attribute: String },
    Limit { limit: usize },
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::IsNull {
            attribute: attribute.into(),
        }
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self::OrderAsc {
            attribute: attribute.into(),
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self::OrderDesc {
            attribute: attribute.into(),
        }
    }

    pub fn limit(limit: usize) -> Self {
        Self::Limit { limit }
    }

    fn accepts(&self, document: &Value) -> bool {
        match self {
            Self::Equal { attribute, value } => document.get(attribute) == Some(value),
            Self::IsNull { attribute } => document.get(attribute).map_or(true, Value::is_null),
            Self::OrderAsc { .. } | Self::OrderDesc { .. } | Self::Limit { .. } => true,
        }
    }
}

/// Listing request for one collection.
///
/// ```
/// use mesa_core::DocumentQuery;
/// use serde_json::json;
///
/// let query = DocumentQuery::collection("orders")
///     .equal("status", "open")
///     .order_desc("createdAt")
///     .limit(2);
///
/// let docs = vec![
///     json!({"status": "open", "createdAt": 1}),
///     json!({"status": "closed", "createdAt": 2}),
///     json!({"status": "open", "createdAt": 3}),
/// ];
/// let result = query.apply(docs);
/// assert_eq!(result[0]["createdAt"], 3);
/// assert_eq!(result.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub collection: String,
    #[serde(default)]
    pub queries: Vec<Query>,
}

impl DocumentQuery {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            queries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    #[must_use]
    pub fn equal(self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Query::equal(attribute, value))
    }

    #[must_use]
    pub fn is_null(self, attribute: impl Into<String>) -> Self {
        self.with(Query::is_null(attribute))
    }

    #[must_use]
    pub fn order_asc(self, attribute: impl Into<String>) -> Self {
        self.with(Query::order_asc(attribute))
    }

    #[must_use]
    pub fn order_desc(self, attribute: impl Into<String>) -> Self {
        self.with(Query::order_desc(attribute))
    }

    #[must_use]
    pub fn limit(self, limit: usize) -> Self {
        self.with(Query::limit(limit))
    }

    /// The smallest limit in the query, if any.
    pub fn effective_limit(&self) -> Option<usize> {
        self.queries
            .iter()
            .filter_map(|q| match q {
                Query::Limit { limit } => Some(*limit),
                _ => None,
            })
            .min()
    }

    /// `true` if `document` passes every filter predicate.
    pub fn matches(&self, document: &Value) -> bool {
        self.queries.iter().all(|q| q.accepts(document))
    }

    /// Filter, order and truncate `documents` the way the source would.
    pub fn apply(&self, documents: Vec<Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = documents
            .into_iter()
            .filter(|doc| self.matches(doc))
            .collect();

        let orderings: Vec<(&str, bool)> = self
            .queries
            .iter()
            .filter_map(|q| match q {
                Query::OrderAsc { attribute } => Some((attribute.as_str(), true)),
                Query::OrderDesc { attribute } => Some((attribute.as_str(), false)),
                _ => None,
            })
            .collect();

        if !orderings.is_empty() {
            selected.sort_by(|a, b| {
                orderings
                    .iter()
                    .map(|(attribute, ascending)| {
                        let ord = compare_values(
                            a.get(*attribute).unwrap_or(&Value::Null),
                            b.get(*attribute).unwrap_or(&Value::Null),
                        );
                        if *ascending {
                            ord
                        } else {
                            ord.reverse()
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.effective_limit() {
            selected.truncate(limit);
        }
        selected
    }
}

// null < bool < number < string < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
