//! # Property Values
//!
//! Nodes and edges carry free-form property bags. Values are a closed tagged
//! union rather than raw JSON so the comparison semantics used by SEG, CON and
//! SYN are defined in one place.
//!
//! On the wire a `PropertyValue` is plain JSON (`null`, `true`, `3.5`,
//! `"text"`, `[...]`, `{...}`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A property mapping. Ordered so that formatting and equality are stable.
pub type Properties = BTreeMap<String, PropertyValue>;

// =============================================================================
// PROPERTY VALUE
// =============================================================================

/// A scalar or nested value stored on a node or edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Numeric view, used by SYN aggregates.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Ordering between two values of the same kind.
    ///
    /// Numbers compare numerically, strings lexicographically, booleans
    /// `false < true`. Mixed kinds and containers are unordered.
    #[must_use]
    pub fn partial_order(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

// =============================================================================
// COMPARISON OPERATORS
// =============================================================================

/// Comparison operators available to property filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    #[default]
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    In,
    Exists,
}

impl CompareOp {
    /// Apply the operator with `actual` on the left-hand side.
    ///
    /// `actual` is `None` when the property is absent. An absent property
    /// only satisfies `neq`.
    #[must_use]
    pub fn apply(self, actual: Option<&PropertyValue>, expected: &PropertyValue) -> bool {
        let Some(actual) = actual else {
            return self == Self::Neq;
        };

        match self {
            Self::Exists => true,
            Self::Eq => actual == expected,
            Self::Neq => actual != expected,
            Self::Gt => actual.partial_order(expected) == Some(Ordering::Greater),
            Self::Lt => actual.partial_order(expected) == Some(Ordering::Less),
            Self::Gte => matches!(
                actual.partial_order(expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lte => matches!(
                actual.partial_order(expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Contains => match (actual, expected) {
                (PropertyValue::String(a), PropertyValue::String(e)) => a.contains(e.as_str()),
                (PropertyValue::List(items), e) => items.contains(e),
                _ => false,
            },
            Self::StartsWith => match (actual, expected) {
                (PropertyValue::String(a), PropertyValue::String(e)) => a.starts_with(e.as_str()),
                _ => false,
            },
            Self::EndsWith => match (actual, expected) {
                (PropertyValue::String(a), PropertyValue::String(e)) => a.ends_with(e.as_str()),
                _ => false,
            },
            Self::In => match expected {
                PropertyValue::List(items) => items.contains(actual),
                _ => false,
            },
        }
    }
}

// =============================================================================
// PROPERTY FILTER
// =============================================================================

/// A single `key <op> value` test against a property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub key: String,
    #[serde(default)]
    pub op: CompareOp,
    #[serde(default)]
    pub value: PropertyValue,
}

impl PropertyFilter {
    pub fn new(key: impl Into<String>, op: CompareOp, value: impl Into<PropertyValue>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for `key eq value`.
    pub fn eq(key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self::new(key, CompareOp::Eq, value)
    }

    /// Shorthand for `key exists`.
    pub fn exists(key: impl Into<String>) -> Self {
        Self::new(key, CompareOp::Exists, PropertyValue::Null)
    }

    #[must_use]
    pub fn matches(&self, properties: &Properties) -> bool {
        self.op.apply(properties.get(&self.key), &self.value)
    }
}

// =============================================================================
// TESTS
// =============================================================================
