//! Normalized query values handed to the content engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::status::ContentStatus;

/// A typed query parameter value.
///
/// Serializes untagged, so a normalized query dumps as plain JSON
/// (`{"include":[3,7],"per_page":5,"status":["publish"]}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// A single integer
    Integer(i64),
    /// An ordered list of integers
    IntegerList(Vec<i64>),
    /// A string, copied from the client as-is
    Text(String),
    /// The statuses a request may see
    Statuses(BTreeSet<ContentStatus>),
    /// Any other client value, passed through verbatim
    Raw(Value),
}

impl QueryValue {
    /// Wraps a client filter value without interpreting it.
    ///
    /// Strings and integral numbers get their typed variants; everything else
    /// is kept as [`Raw`](QueryValue::Raw).
    pub fn verbatim(value: &Value) -> Self {
        match value {
            Value::String(s) => QueryValue::Text(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => QueryValue::Integer(i),
                None => QueryValue::Raw(value.clone()),
            },
            other => QueryValue::Raw(other.clone()),
        }
    }

    /// Returns the integer, if this is an `Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the integers, if this is an `IntegerList`.
    pub fn as_integer_list(&self) -> Option<&[i64]> {
        match self {
            QueryValue::IntegerList(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text, if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the statuses, if this is a `Statuses`.
    pub fn as_statuses(&self) -> Option<&BTreeSet<ContentStatus>> {
        match self {
            QueryValue::Statuses(statuses) => Some(statuses),
            _ => None,
        }
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<Vec<i64>> for QueryValue {
    fn from(value: Vec<i64>) -> Self {
        QueryValue::IntegerList(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

/// The parameter set of the outgoing request, keyed by parameter name.
pub type RequestParams = BTreeMap<String, QueryValue>;

/// Canonical query arguments produced by the legacy filter translator.
///
/// Keys iterate in sorted order, so two translations of the same filter
/// compare and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedQuery {
    params: BTreeMap<String, QueryValue>,
}

impl NormalizedQuery {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: QueryValue) {
        self.params.insert(name.into(), value);
    }

    /// Returns a parameter value.
    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.params.get(name)
    }

    /// Returns `true` if the parameter is set.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Returns the `per_page` value, if it is an integer.
    pub fn per_page(&self) -> Option<i64> {
        self.get("per_page").and_then(QueryValue::as_integer)
    }

    /// Returns the `status` set, if present.
    pub fn status(&self) -> Option<&BTreeSet<ContentStatus>> {
        self.get("status").and_then(QueryValue::as_statuses)
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the parameter names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl IntoIterator for NormalizedQuery {
    type Item = (String, QueryValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, QueryValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}
