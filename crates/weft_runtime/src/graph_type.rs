//! Native type identities and type expressions.
//!
//! A Rust type takes part in a schema by implementing [`GraphType`]. The
//! registry keys named types by [`AnyType`] and turns a [`TypeExpr`] into a
//! [`TypeRef`](crate::types::TypeRef).

use crate::resolve::{OpaqueValue, Resolved};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use weft_core::Map;

/// Identity of a native type.
#[derive(Clone, Copy)]
pub struct AnyType {
    id: TypeId,
    name: &'static str,
}

impl AnyType {
    /// The identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The full Rust type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the `()` "no type" marker.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }
}

impl PartialEq for AnyType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AnyType {}

impl Hash for AnyType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for AnyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyType({})", self.name)
    }
}

impl fmt::Display for AnyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A native type expression, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A leaf type looked up by identity, falling back to its name.
    Named { ty: AnyType, name: String },
    /// A nullable position.
    Optional(Box<TypeExpr>),
    /// A list of the inner type.
    List(Box<TypeExpr>),
    /// An explicit forward reference by name.
    Reference(String),
}

impl TypeExpr {
    /// A leaf expression for `T`.
    #[must_use]
    pub fn named<T: GraphType>() -> Self {
        Self::Named {
            ty: AnyType::of::<T>(),
            name: T::type_name(),
        }
    }

    /// The name of the innermost named type.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        match self {
            Self::Named { name, .. } | Self::Reference(name) => name,
            Self::Optional(inner) | Self::List(inner) => inner.leaf_name(),
        }
    }
}

/// A Rust type usable in a schema.
///
/// Object, interface, enum and scalar types implement this with an empty
/// impl block; the defaults infer the name and box the value.
pub trait GraphType: Sized + Send + Sync + 'static {
    /// The inferred schema name: the last path segment of the Rust type
    /// name, without generic arguments.
    fn type_name() -> String {
        short_type_name::<Self>()
    }

    /// The type expression this type resolves to.
    fn type_expr() -> TypeExpr {
        TypeExpr::named::<Self>()
    }

    /// Converts a resolver's return value into the engine's shape.
    fn into_resolved(self) -> Resolved {
        Resolved::Value(OpaqueValue::new(self))
    }
}

/// Shortens a Rust type name to the last path segment of its outer type.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let outer = full.split('<').next().unwrap_or(full);
    outer.rsplit("::").next().unwrap_or(outer).to_string()
}

macro_rules! builtin_graph_type {
    ($name:literal => $($ty:ty),+) => {
        $(
            impl GraphType for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }
            }
        )+
    };
}

builtin_graph_type!("Int" => i8, i16, i32, i64, u8, u16, u32);
builtin_graph_type!("Float" => f32, f64);
builtin_graph_type!("String" => String);
builtin_graph_type!("Boolean" => bool);
builtin_graph_type!("ID" => Id);
builtin_graph_type!("_Any" => Map);

/// A value of the built-in `ID` scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Id {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Id {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<T: GraphType> GraphType for Option<T> {
    fn type_name() -> String {
        T::type_name()
    }

    fn type_expr() -> TypeExpr {
        TypeExpr::Optional(Box::new(T::type_expr()))
    }

    fn into_resolved(self) -> Resolved {
        self.map_or(Resolved::Null, GraphType::into_resolved)
    }
}

impl<T: GraphType> GraphType for Vec<T> {
    fn type_name() -> String {
        T::type_name()
    }

    fn type_expr() -> TypeExpr {
        TypeExpr::List(Box::new(T::type_expr()))
    }

    fn into_resolved(self) -> Resolved {
        Resolved::List(self.into_iter().map(GraphType::into_resolved).collect())
    }
}

impl<T: GraphType> GraphType for Box<T> {
    fn type_name() -> String {
        T::type_name()
    }

    fn type_expr() -> TypeExpr {
        T::type_expr()
    }

    fn into_resolved(self) -> Resolved {
        (*self).into_resolved()
    }
}

/// Shared values keep their allocation. Only use `Arc` around named types;
/// an `Arc<Vec<T>>` is not unpacked into a list.
impl<T: GraphType> GraphType for Arc<T> {
    fn type_name() -> String {
        T::type_name()
    }

    fn type_expr() -> TypeExpr {
        T::type_expr()
    }

    fn into_resolved(self) -> Resolved {
        Resolved::Value(OpaqueValue::from_arc(self))
    }
}

/// An explicit forward reference to `T`, for recursive or not yet declared
/// types.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeReference<T>(pub T);

impl<T: GraphType> GraphType for TypeReference<T> {
    fn type_name() -> String {
        T::type_name()
    }

    fn type_expr() -> TypeExpr {
        TypeExpr::Reference(T::type_name())
    }

    fn into_resolved(self) -> Resolved {
        self.0.into_resolved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod nested {
        pub struct Comment;
        pub struct Page<T>(pub T);
    }

    impl GraphType for nested::Comment {}

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<nested::Comment>(), "Comment");
        assert_eq!(short_type_name::<nested::Page<nested::Comment>>(), "Page");
        assert_eq!(nested::Comment::type_name(), "Comment");
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(i32::type_name(), "Int");
        assert_eq!(u8::type_name(), "Int");
        assert_eq!(f64::type_name(), "Float");
        assert_eq!(Id::type_name(), "ID");
        assert_eq!(Option::<Vec<String>>::type_name(), "String");
    }

    #[test]
    fn test_type_expr_modifiers() {
        assert_eq!(
            Option::<Vec<i32>>::type_expr(),
            TypeExpr::Optional(Box::new(TypeExpr::List(Box::new(TypeExpr::named::<i32>()))))
        );
        assert_eq!(
            TypeReference::<nested::Comment>::type_expr(),
            TypeExpr::Reference("Comment".into())
        );
        assert_eq!(Box::<nested::Comment>::type_expr(), TypeExpr::named::<nested::Comment>());
    }

    #[test]
    fn test_any_type_identity() {
        assert_eq!(AnyType::of::<i32>(), AnyType::of::<i32>());
        assert_ne!(AnyType::of::<i32>(), AnyType::of::<i64>());
        assert!(AnyType::of::<()>().is_unit());
    }

    #[test]
    fn test_into_resolved() {
        assert!(None::<i32>.into_resolved().is_null());
        let Resolved::List(items) = vec![Some(1_i32), None].into_resolved() else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 2);
        assert!(items[1].is_null());
    }
}
