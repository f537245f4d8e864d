//! Filter groups for collection queries.
//!
//! A [`FilterGroup`] is sent to the I/O provider as-is and doubles as part of
//! the cache key for `get` calls, through its [`FilterGroup::canonical`] form.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the members of a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// Comparison applied by a single [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Contains,
    StartsWith,
    EndsWith,
    IsContainedIn,
    IsNotContainedIn,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_name: String,
    pub operator: Operator,
    pub value: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negated: bool,
}

impl Filter {
    pub fn new(field_name: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
            value: value.into(),
            negated: false,
        }
    }

    /// Shorthand for an `equals` filter.
    pub fn eq(field_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_name, Operator::Equals, value)
    }

    /// Inverts the result of this filter.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Evaluates the filter against a JSON object.
    ///
    /// A missing field only satisfies `not_equal_to` and
    /// `is_not_contained_in` (or a negated filter).
    pub fn matches(&self, object: &Value) -> bool {
        let field = object.get(&self.field_name).unwrap_or(&Value::Null);
        let result = match self.operator {
            Operator::Equals => values_equal(field, &self.value),
            Operator::NotEqualTo => !values_equal(field, &self.value),
            Operator::GreaterThan => compare(field, &self.value) == Some(Ordering::Greater),
            Operator::GreaterThanOrEqualTo => matches!(
                compare(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::LessThan => compare(field, &self.value) == Some(Ordering::Less),
            Operator::LessThanOrEqualTo => matches!(
                compare(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Contains => match (field, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::Array(items), needle) => items.iter().any(|item| values_equal(item, needle)),
                _ => false,
            },
            Operator::StartsWith => match (field, &self.value) {
                (Value::String(s), Value::String(prefix)) => s.starts_with(prefix.as_str()),
                _ => false,
            },
            Operator::EndsWith => match (field, &self.value) {
                (Value::String(s), Value::String(suffix)) => s.ends_with(suffix.as_str()),
                _ => false,
            },
            Operator::IsContainedIn => contained_in(field, &self.value),
            Operator::IsNotContainedIn => !contained_in(field, &self.value),
        };
        result != self.negated
    }
}

/// A member of a [`FilterGroup`]: a nested group or a single filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(FilterGroup),
    Filter(Filter),
}

impl From<Filter> for FilterNode {
    fn from(filter: Filter) -> Self {
        Self::Filter(filter)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        Self::Group(group)
    }
}

/// A combination of filters and nested groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub combinator: Combinator,
    pub filters: Vec<FilterNode>,
}

impl FilterGroup {
    /// A group whose members must all match.
    pub fn all<I, N>(filters: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FilterNode>,
    {
        Self {
            combinator: Combinator::And,
            filters: filters.into_iter().map(Into::into).collect(),
        }
    }

    /// A group where any member may match.
    pub fn any<I, N>(filters: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<FilterNode>,
    {
        Self {
            combinator: Combinator::Or,
            filters: filters.into_iter().map(Into::into).collect(),
        }
    }

    /// Evaluates the group against a JSON object. An empty group matches
    /// everything.
    pub fn matches(&self, object: &Value) -> bool {
        let mut results = self.filters.iter().map(|node| match node {
            FilterNode::Group(group) => group.matches(object),
            FilterNode::Filter(filter) => filter.matches(object),
        });
        match self.combinator {
            Combinator::And => results.all(|r| r),
            Combinator::Or => self.filters.is_empty() || results.any(|r| r),
        }
    }

    /// Stable string form used in cache keys.
    ///
    /// Object keys are sorted at every level, so structurally equal groups
    /// always produce the same string.
    pub fn canonical(&self) -> String {
        match serde_json::to_value(self) {
            Ok(value) => canonical_json(&value),
            // Serializing plain data into a Value cannot fail; fall back to Debug.
            Err(_) => format!("{:?}", self),
        }
    }

    /// JSON text sent on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Canonical form of an optional filter group; `None` maps to `"null"`.
pub fn canonicalize(filters: Option<&FilterGroup>) -> String {
    filters.map_or_else(|| "null".to_string(), FilterGroup::canonical)
}

/// Serializes `value` as compact JSON with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn contained_in(field: &Value, set: &Value) -> bool {
    match set {
        Value::Array(items) => items.iter().any(|item| values_equal(field, item)),
        _ => false,
    }
}
