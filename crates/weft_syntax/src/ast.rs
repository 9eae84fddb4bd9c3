//! Executable document AST.

use indexmap::IndexMap;
use weft_core::{Map, Span};

/// A parsed request document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub definitions: Vec<Definition>,
}

impl Document {
    /// Iterates over the operations in the document.
    pub fn operations(&self) -> impl Iterator<Item = &OperationDefinition> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
    }

    /// Iterates over the fragment definitions in the document.
    pub fn fragments(&self) -> impl Iterator<Item = &FragmentDefinition> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Fragment(fragment) => Some(fragment),
            Definition::Operation(_) => None,
        })
    }

    /// Selects the operation to run.
    ///
    /// With a name, the operation with that name; without one, the only
    /// operation in the document.
    pub fn operation(&self, name: Option<&str>) -> Option<&OperationDefinition> {
        match name {
            Some(name) => self
                .operations()
                .find(|op| op.name.as_deref() == Some(name)),
            None => {
                let mut operations = self.operations();
                let first = operations.next();
                if operations.next().is_some() {
                    None
                } else {
                    first
                }
            }
        }
    }
}

/// A top-level definition.
#[derive(Debug, Clone)]
pub enum Definition {
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

/// The kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

/// An operation definition.
#[derive(Debug, Clone)]
pub struct OperationDefinition {
    pub operation: OperationType,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// A variable definition.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: TypeAnnotation,
    pub default_value: Option<Value>,
    pub span: Span,
}

/// A type as written in a variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeAnnotation {
    Named(String),
    List(Box<TypeAnnotation>),
    NonNull(Box<TypeAnnotation>),
}

impl TypeAnnotation {
    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// A fragment definition.
#[derive(Debug, Clone)]
pub struct FragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// A selection set.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    pub selections: Vec<Selection>,
    pub span: Span,
}

/// A selection.
#[derive(Debug, Clone)]
pub enum Selection {
    Field(Field),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

impl Selection {
    /// Returns the directives attached to this selection.
    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Field(field) => &field.directives,
            Self::FragmentSpread(spread) => &spread.directives,
            Self::InlineFragment(fragment) => &fragment.directives,
        }
    }
}

/// A field selection.
#[derive(Debug, Clone)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub directives: Vec<Directive>,
    pub selection_set: Option<SelectionSet>,
    pub span: Span,
}

impl Field {
    /// The key this field is written under in the response.
    #[must_use]
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Finds an argument literal by name.
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }
}

/// A fragment spread.
#[derive(Debug, Clone)]
pub struct FragmentSpread {
    pub name: String,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// An inline fragment.
#[derive(Debug, Clone)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// A directive application.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub span: Span,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Converts the literal into a `Map`, substituting variables.
    ///
    /// Variables missing from `variables` become `Null`. Enum values become
    /// strings holding the enum value name.
    #[must_use]
    pub fn to_map(&self, variables: &IndexMap<String, Map>) -> Map {
        match self {
            Self::Variable(name) => variables.get(name).cloned().unwrap_or_default(),
            Self::Int(i) => Map::Int(*i),
            Self::Float(f) => Map::Double(*f),
            Self::String(s) | Self::Enum(s) => Map::String(s.clone()),
            Self::Boolean(b) => Map::Bool(*b),
            Self::Null => Map::Null,
            Self::List(items) => Map::Array(items.iter().map(|v| v.to_map(variables)).collect()),
            Self::Object(fields) => fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_map(variables)))
                .collect(),
        }
    }
}
