//! Raw field values carried by layers.
//!
//! Layer files are decoded through `serde_json::Value`, so the same loader code
//! accepts JSON and RON bodies. A `null` (RON `()`) becomes [`Value::Delete`],
//! the sentinel that tells the combiner to drop an inherited field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered field map of one record.
pub type Fields = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Fields),
    /// Removes the field from the combined record. Never present in a dataset.
    Delete,
}

/// Coarse structural class of a value, used to reject overlays that would
/// swap a list for a scalar and similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    List,
    Object,
}

impl Shape {
    pub fn name(self) -> &'static str {
        match self {
            Shape::Scalar => "scalar",
            Shape::List => "list",
            Shape::Object => "object",
        }
    }
}

impl Value {
    /// `None` for the deletion sentinel, which has no shape.
    pub fn shape(&self) -> Option<Shape> {
        match self {
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => Some(Shape::Scalar),
            Value::List(_) => Some(Shape::List),
            Value::Object(_) => Some(Shape::Object),
            Value::Delete => None,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Value::Delete)
    }

    /// Whether a deletion sentinel appears anywhere in this value.
    pub fn contains_delete(&self) -> bool {
        match self {
            Value::Delete => true,
            Value::List(items) => items.iter().any(Value::contains_delete),
            Value::Object(fields) => fields.values().any(Value::contains_delete),
            _ => false,
        }
    }

    /// This value with every nested sentinel dropped from its lists and
    /// objects. Nested values replace wholesale, so a sentinel below the top
    /// level of a field has nothing to delete.
    pub fn without_deletes(self) -> Value {
        match self {
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .filter(|item| !item.is_delete())
                    .map(Value::without_deletes)
                    .collect(),
            ),
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .filter(|(_, value)| !value.is_delete())
                    .map(|(name, value)| (name, value.without_deletes()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Delete,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            // Non-finite floats have no JSON form and export as null
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
            Value::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
            Value::Delete => serde_json::Value::Null,
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        (&value).into()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}
