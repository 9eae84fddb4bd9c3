//! The universal weakly-typed value.
//!
//! `Map` is used for field arguments, variable values, default values and
//! literal values. It mirrors the JSON data model but keeps integers and
//! doubles apart so that both round-trip through the coders unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// A weakly-typed value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Map {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Map>),
    Object(IndexMap<String, Map>),
}

static NULL: Map = Map::Null;

impl Map {
    /// Creates an empty object.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(IndexMap::new())
    }

    /// Returns true if this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a double, widening integers.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Map]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&IndexMap<String, Map>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Gets a field of an object value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Map> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// Inserts a field, turning `Null` into an empty object first.
    ///
    /// Returns the previous value of the field, if any. Non-object values
    /// are left untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Map>) -> Option<Map> {
        if self.is_null() {
            *self = Self::object();
        }
        match self {
            Self::Object(fields) => fields.insert(key.into(), value.into()),
            _ => None,
        }
    }

    /// Short name of the value kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl Index<&str> for Map {
    type Output = Map;

    fn index(&self, key: &str) -> &Map {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Map {
    type Output = Map;

    fn index(&self, index: usize) -> &Map {
        self.as_array()
            .and_then(|items| items.get(index))
            .unwrap_or(&NULL)
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<bool> for Map {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Map {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Map {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Map {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Map {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Map {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Map>> From<Vec<T>> for Map {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Map>> From<Option<T>> for Map {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<IndexMap<String, Map>> for Map {
    fn from(fields: IndexMap<String, Map>) -> Self {
        Self::Object(fields)
    }
}

impl FromIterator<(String, Map)> for Map {
    fn from_iter<I: IntoIterator<Item = (String, Map)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Map {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map_or(Self::Null, Self::Double)
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => {
                Self::Object(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<Map> for serde_json::Value {
    fn from(map: Map) -> Self {
        use serde_json::Value;

        match map {
            Map::Null => Value::Null,
            Map::Bool(b) => Value::Bool(b),
            Map::Int(i) => Value::Number(i.into()),
            Map::Double(d) => serde_json::Number::from_f64(d).map_or(Value::Null, Value::Number),
            Map::String(s) => Value::String(s),
            Map::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Map::Object(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
