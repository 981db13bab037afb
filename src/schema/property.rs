//! Property values and dotted-path flattening.
//!
//! Both directions agree on one rule: nested objects never reach the graph as
//! maps. `{"id_perms": {"enable": true}}` is stored on the vertex as the
//! single property `id_perms.enable = true`, and the listing fragments read
//! it back by that same path.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::errors::PropertyError;

/// Separator between the segments of a flattened property path.
pub const PATH_SEPARATOR: char = '.';

/// Flattened property bag, keyed by dotted path.
pub type PropertyBag = BTreeMap<String, PropertyValue>;

/// A property value as stored on a vertex.
///
/// `Object` only ever appears as a list element: top-level objects are
/// flattened into their leaves before they reach a bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Convert a decoded JSON value, keeping its shape.
    ///
    /// Returns `Ok(None)` for `null`, which has no graph representation.
    /// Integers that do not fit in `i64` are rejected instead of being
    /// silently widened to a float.
    pub fn from_json(value: &Value) -> Result<Option<Self>, String> {
        let converted = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PropertyValue::Int(i)
                } else if n.is_f64() {
                    match n.as_f64() {
                        Some(f) => PropertyValue::Float(f),
                        None => return Err(format!("unrepresentable number {}", n)),
                    }
                } else {
                    return Err(format!("integer {} does not fit in i64", n));
                }
            }
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    // nulls inside a list are dropped, the remaining order is kept
                    if let Some(v) = PropertyValue::from_json(item)? {
                        list.push(v);
                    }
                }
                PropertyValue::List(list)
            }
            Value::Object(map) => {
                let mut object = BTreeMap::new();
                for (key, item) in map {
                    if let Some(v) = PropertyValue::from_json(item)? {
                        object.insert(key.clone(), v);
                    }
                }
                PropertyValue::Object(object)
            }
        };
        Ok(Some(converted))
    }

    /// JSON form, used when the value travels as a query binding.
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Int(i) => Value::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            PropertyValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, PropertyValue::List(_))
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::List(_) => "list",
            PropertyValue::Object(_) => "object",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

/// Join two path segments. An empty parent yields the child unchanged.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}{}{}", parent, PATH_SEPARATOR, child)
    }
}

/// Build a property path from its segments, e.g. `["id_perms", "enable"]`.
pub fn property_path(segments: &[&str]) -> String {
    segments.iter().fold(String::new(), |acc, s| join_path(&acc, s))
}

/// Flatten `value` found at `path` into `bag`.
///
/// Objects recurse with `parent.child` paths; every other value (lists
/// included, even lists of objects) is a leaf. Null leaves are skipped.
/// An empty object contributes nothing.
pub fn flatten_into(path: &str, value: &Value, bag: &mut PropertyBag) -> Result<(), PropertyError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&join_path(path, key), child, bag)?;
            }
            Ok(())
        }
        leaf => {
            let converted = PropertyValue::from_json(leaf).map_err(|reason| PropertyError {
                path: path.to_string(),
                reason,
            })?;
            if let Some(v) = converted {
                bag.insert(path.to_string(), v);
            }
            Ok(())
        }
    }
}
