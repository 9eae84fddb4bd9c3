//! Error types for schema construction and field resolution.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use weft_core::{CoderError, Location, Map};

/// Result type for field resolution.
pub type FieldResult<T> = Result<T, FieldError>;

/// A segment of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Formats a path as `a.0.b`.
#[must_use]
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// A field-scoped request error.
///
/// Field errors never abort a request: the failing field resolves to null
/// and its siblings continue.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FieldError {
    /// The error message.
    pub message: String,
    /// Source locations of the offending selection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// The response path of the failing field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    /// Error extensions.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Map>,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: IndexMap::new(),
        }
    }

    /// Sets the response path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    /// Adds a source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    /// Adds an extension.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Map>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Sets the error code extension.
    #[must_use]
    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.with_extension("code", code.into())
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<CoderError> for FieldError {
    fn from(error: CoderError) -> Self {
        Self::new(error.to_string())
    }
}

/// A fatal error raised while building a schema.
///
/// The first construction error aborts schema creation; no request can be
/// served from a partially built schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("type `{rust_type}` is already registered as `{name}`")]
    DuplicateRegistration { rust_type: String, name: String },

    #[error("a type named `{name}` is already registered")]
    DuplicateTypeName { name: String },

    #[error("type `{name}` used by {usage} was never registered")]
    UnresolvedReference { name: String, usage: String },

    #[error("{usage} expects `{name}` to be {expected}, but it is {found}")]
    KindMismatch {
        usage: String,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{usage} requires `{name}` to be registered before it")]
    Unregistered { usage: String, name: String },

    #[error("schema must contain at least one query field or federated resolver")]
    MissingQuery,

    #[error("argument `{argument}` is declared more than once on `{field}`")]
    DuplicateArgument { field: String, argument: String },

    #[error("field `{field}` is declared more than once on `{owner}`")]
    DuplicateField { owner: String, field: String },

    #[error("key argument `{argument}` is not a field of `{type_name}`")]
    UnknownKeyField { type_name: String, argument: String },

    #[error("keys `{first}` and `{second}` of `{type_name}` overlap")]
    AmbiguousKeys {
        type_name: String,
        first: String,
        second: String,
    },

    #[error("invalid default value for {usage}: {source}")]
    InvalidDefault { usage: String, source: CoderError },

    #[error("values of enum `{name}` must encode to strings, found {found}")]
    InvalidEnumValue { name: String, found: String },

    #[error("enum `{name}` declares value `{value}` more than once")]
    DuplicateEnumValue { name: String, value: String },

    #[error("the {root} root is already assigned")]
    DuplicateRoot { root: &'static str },
}
