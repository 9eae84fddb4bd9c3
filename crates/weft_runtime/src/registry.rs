//! Type Registry & Reference Resolver.
//!
//! The registry is the mutable half of schema construction. Named types live
//! in an arena of slots addressed by [`TypeIndex`]. A type expression whose
//! leaf is not registered yet reserves a pending slot under its name; a later
//! registration with that name fills the slot, so every reference and the
//! direct registration share one index. [`TypeRegistry::finish`] checks that
//! every slot was filled and freezes the arena into a [`Schema`].

use crate::error::ConstructionError;
use crate::graph_type::{AnyType, GraphType, Id, TypeExpr};
use crate::scalars;
use crate::schema::{Roots, Schema};
use crate::types::{NamedType, TypeIndex, TypeKind, TypeRef};
use rustc_hash::FxHashMap;
use tracing::debug;
use weft_syntax::OperationType;

struct Slot {
    name: String,
    ty: Option<NamedType>,
    /// The usage that first reserved this slot.
    usage: String,
}

/// A kind check postponed until the referenced type is registered.
struct PendingCheck {
    index: TypeIndex,
    usage: String,
    input: bool,
}

/// The mutable type registry used during construction.
pub struct TypeRegistry {
    slots: Vec<Slot>,
    by_name: FxHashMap<String, TypeIndex>,
    by_type: FxHashMap<AnyType, TypeIndex>,
    roots: Roots,
    checks: Vec<PendingCheck>,
    description: Option<String>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a new registry seeded with the built-in scalars.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            slots: Vec::new(),
            by_name: FxHashMap::default(),
            by_type: FxHashMap::default(),
            roots: Roots::default(),
            checks: Vec::new(),
            description: None,
        };

        let int = registry.insert(NamedType::Scalar(scalars::int()));
        let float = registry.insert(NamedType::Scalar(scalars::float()));
        let string = registry.insert(NamedType::Scalar(scalars::string()));
        let boolean = registry.insert(NamedType::Scalar(scalars::boolean()));
        let id = registry.insert(NamedType::Scalar(scalars::id()));

        for ty in [
            AnyType::of::<i32>(),
            AnyType::of::<i64>(),
            AnyType::of::<i16>(),
            AnyType::of::<i8>(),
            AnyType::of::<u8>(),
            AnyType::of::<u16>(),
            AnyType::of::<u32>(),
        ] {
            registry.by_type.insert(ty, int);
        }
        registry.by_type.insert(AnyType::of::<f64>(), float);
        registry.by_type.insert(AnyType::of::<f32>(), float);
        registry.by_type.insert(AnyType::of::<String>(), string);
        registry.by_type.insert(AnyType::of::<bool>(), boolean);
        registry.by_type.insert(AnyType::of::<Id>(), id);

        registry
    }

    /// Sets the schema description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Puts a named type into a fresh slot. Only used while seeding.
    fn insert(&mut self, ty: NamedType) -> TypeIndex {
        let index = self.next_index();
        self.by_name.insert(ty.name().to_string(), index);
        self.slots.push(Slot {
            name: ty.name().to_string(),
            ty: Some(ty),
            usage: String::from("built-in"),
        });
        index
    }

    fn next_index(&self) -> TypeIndex {
        #[allow(clippy::cast_possible_truncation)]
        TypeIndex(self.slots.len() as u32)
    }

    /// Finds or reserves the slot for `name`.
    fn reserve(&mut self, name: &str, usage: &str) -> TypeIndex {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.next_index();
        self.slots.push(Slot {
            name: name.to_string(),
            ty: None,
            usage: usage.to_string(),
        });
        self.by_name.insert(name.to_string(), index);
        index
    }

    /// Resolves a native type expression.
    ///
    /// Positions are non-null unless wrapped in `Optional`. A leaf that is
    /// not registered yet, or an explicit reference, resolves to a pending
    /// slot that must be filled before [`finish`](Self::finish).
    pub fn resolve(&mut self, expr: &TypeExpr, usage: &str) -> TypeRef {
        self.resolve_with(expr, false, usage)
    }

    fn resolve_with(&mut self, expr: &TypeExpr, nullable: bool, usage: &str) -> TypeRef {
        let ty = match expr {
            TypeExpr::Optional(inner) => return self.resolve_with(inner, true, usage),
            TypeExpr::List(inner) => self.resolve_with(inner, false, usage).list(),
            TypeExpr::Reference(name) => TypeRef::Named(self.reserve(name, usage)),
            TypeExpr::Named { ty, name } => match self.by_type.get(ty) {
                Some(&index) => TypeRef::Named(index),
                None => TypeRef::Named(self.reserve(name, usage)),
            },
        };

        if nullable {
            ty
        } else {
            ty.non_null()
        }
    }

    /// Registers the named type for a native type.
    ///
    /// Registering `()` is a no-op and returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateRegistration`] if `ty` is
    /// already registered, or [`ConstructionError::DuplicateTypeName`] if
    /// another type already uses the name.
    pub fn register(
        &mut self,
        ty: AnyType,
        named: NamedType,
    ) -> Result<Option<TypeIndex>, ConstructionError> {
        if ty.is_unit() {
            return Ok(None);
        }
        if let Some(&index) = self.by_type.get(&ty) {
            return Err(ConstructionError::DuplicateRegistration {
                rust_type: ty.name().to_string(),
                name: self.slots[index.index()].name.clone(),
            });
        }

        let index = self.register_named(named)?;
        self.by_type.insert(ty, index);
        Ok(Some(index))
    }

    /// Registers a named type that has no native type of its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateTypeName`] if the name is taken.
    pub fn register_named(&mut self, named: NamedType) -> Result<TypeIndex, ConstructionError> {
        let name = named.name().to_string();
        let index = self.reserve(&name, "registration");
        let slot = &mut self.slots[index.index()];
        if slot.ty.is_some() {
            return Err(ConstructionError::DuplicateTypeName { name });
        }

        debug!(kind = ?named.kind(), name = %name, index = index.0, "registered type");
        slot.ty = Some(named);
        Ok(index)
    }

    /// Maps another native type onto an already registered named type.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateRegistration`] if `ty` is
    /// already registered.
    pub fn alias(&mut self, ty: AnyType, index: TypeIndex) -> Result<(), ConstructionError> {
        if let Some(&existing) = self.by_type.get(&ty) {
            return Err(ConstructionError::DuplicateRegistration {
                rust_type: ty.name().to_string(),
                name: self.slots[existing.index()].name.clone(),
            });
        }
        self.by_type.insert(ty, index);
        Ok(())
    }

    /// Registers an object type as a schema root.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateRoot`] if the root is already
    /// assigned, or a registration error for the object itself.
    pub fn register_root(
        &mut self,
        operation: OperationType,
        object: NamedType,
    ) -> Result<TypeIndex, ConstructionError> {
        let slot = match operation {
            OperationType::Query => &self.roots.query,
            OperationType::Mutation => &self.roots.mutation,
            OperationType::Subscription => &self.roots.subscription,
        };
        if slot.is_some() {
            return Err(ConstructionError::DuplicateRoot {
                root: operation.as_str(),
            });
        }

        let index = self.register_named(object)?;
        match operation {
            OperationType::Query => self.roots.query = Some(index),
            OperationType::Mutation => self.roots.mutation = Some(index),
            OperationType::Subscription => self.roots.subscription = Some(index),
        }
        Ok(index)
    }

    /// Looks up the index registered for a native type.
    #[must_use]
    pub fn lookup(&self, ty: AnyType) -> Option<TypeIndex> {
        self.by_type.get(&ty).copied()
    }

    /// Looks up the index registered for `T`.
    #[must_use]
    pub fn index_of<T: GraphType>(&self) -> Option<TypeIndex> {
        self.lookup(AnyType::of::<T>())
    }

    /// Looks up a slot by name, registered or pending.
    #[must_use]
    pub fn lookup_name(&self, name: &str) -> Option<TypeIndex> {
        self.by_name.get(name).copied()
    }

    /// The named type in a slot, if it has been registered.
    #[must_use]
    pub fn get(&self, index: TypeIndex) -> Option<&NamedType> {
        self.slots.get(index.index()).and_then(|slot| slot.ty.as_ref())
    }

    /// The name of a slot.
    #[must_use]
    pub fn name_of(&self, index: TypeIndex) -> &str {
        self.slots
            .get(index.index())
            .map_or("<unknown>", |slot| slot.name.as_str())
    }

    /// Resolves an output position.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::KindMismatch`] if the type is an input
    /// object. Pending types are checked at [`finish`](Self::finish).
    pub fn get_output_type(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
    ) -> Result<TypeRef, ConstructionError> {
        self.get_checked(expr, usage, false)
    }

    /// Resolves an input position.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::KindMismatch`] if the type is an object,
    /// interface or union. Pending types are checked at
    /// [`finish`](Self::finish).
    pub fn get_input_type(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
    ) -> Result<TypeRef, ConstructionError> {
        self.get_checked(expr, usage, true)
    }

    fn get_checked(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
        input: bool,
    ) -> Result<TypeRef, ConstructionError> {
        let ty = self.resolve(expr, usage);
        let index = ty.named();
        match self.get(index) {
            Some(named) => check_position(named, usage, input)?,
            None => self.checks.push(PendingCheck {
                index,
                usage: usage.to_string(),
                input,
            }),
        }
        Ok(ty)
    }

    /// Resolves a type that must already be registered as an interface.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::Unregistered`] or
    /// [`ConstructionError::KindMismatch`].
    pub fn get_interface_type(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
    ) -> Result<TypeIndex, ConstructionError> {
        self.get_of_kind(expr, usage, Some(TypeKind::Interface))
    }

    /// Resolves a type that must already be registered as an object.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::Unregistered`] or
    /// [`ConstructionError::KindMismatch`].
    pub fn get_object_type(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
    ) -> Result<TypeIndex, ConstructionError> {
        self.get_of_kind(expr, usage, Some(TypeKind::Object))
    }

    /// Resolves a type that must already be registered, of any kind.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::Unregistered`].
    pub fn get_named_type(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
    ) -> Result<TypeIndex, ConstructionError> {
        self.get_of_kind(expr, usage, None)
    }

    fn get_of_kind(
        &mut self,
        expr: &TypeExpr,
        usage: &str,
        kind: Option<TypeKind>,
    ) -> Result<TypeIndex, ConstructionError> {
        let index = self.resolve(expr, usage).named();
        let Some(named) = self.get(index) else {
            return Err(ConstructionError::Unregistered {
                usage: usage.to_string(),
                name: self.name_of(index).to_string(),
            });
        };

        match kind {
            Some(kind) if named.kind() != kind => Err(ConstructionError::KindMismatch {
                usage: usage.to_string(),
                name: named.name().to_string(),
                expected: kind.describe(),
                found: named.kind().describe(),
            }),
            _ => Ok(index),
        }
    }

    /// Freezes the registry into a schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::MissingQuery`] without a query root,
    /// [`ConstructionError::UnresolvedReference`] for the first slot that was
    /// referenced but never registered, or the first failing postponed kind
    /// check.
    pub fn finish(self) -> Result<Schema, ConstructionError> {
        let Some(query) = self.roots.query else {
            return Err(ConstructionError::MissingQuery);
        };

        let mut types = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            match slot.ty {
                Some(ty) => types.push(ty),
                None => {
                    return Err(ConstructionError::UnresolvedReference {
                        name: slot.name,
                        usage: slot.usage,
                    })
                }
            }
        }

        for check in &self.checks {
            check_position(&types[check.index.index()], &check.usage, check.input)?;
        }

        Ok(Schema::new(
            types,
            self.by_name,
            self.by_type,
            query,
            self.roots,
            self.description,
        ))
    }
}

fn check_position(named: &NamedType, usage: &str, input: bool) -> Result<(), ConstructionError> {
    let kind = named.kind();
    let (ok, expected) = if input {
        (kind.is_input(), "an input type")
    } else {
        (kind.is_output(), "an output type")
    };
    if ok {
        Ok(())
    } else {
        Err(ConstructionError::KindMismatch {
            usage: usage.to_string(),
            name: named.name().to_string(),
            expected,
            found: kind.describe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_type::TypeReference;
    use crate::resolve::{ready, OpaqueValue, ResolveInfo, Spawner};
    use crate::types::{FieldDefinition, InputObjectType, InterfaceType, ObjectType};
    use indexmap::IndexMap;
    use std::sync::Arc;
    use weft_core::Map;

    struct Comment;
    impl GraphType for Comment {}

    struct Node;
    impl GraphType for Node {}

    struct Filter;
    impl GraphType for Filter {}

    fn object(name: &str, fields: Vec<(&str, TypeRef)>) -> NamedType {
        NamedType::Object(ObjectType {
            name: name.to_string(),
            description: None,
            fields: fields
                .into_iter()
                .map(|(field, ty)| {
                    (
                        field.to_string(),
                        FieldDefinition {
                            name: field.to_string(),
                            description: None,
                            deprecation_reason: None,
                            ty,
                            arguments: IndexMap::new(),
                            resolve: Arc::new(
                                |_: OpaqueValue, _: Map, _: OpaqueValue, _: Spawner, _: ResolveInfo| {
                                    ready(Ok(None::<i32>))
                                },
                            ),
                        },
                    )
                })
                .collect(),
            interfaces: Vec::new(),
            is_instance: Arc::new(|_: &OpaqueValue| true),
            keys: Vec::new(),
        })
    }

    fn with_query(registry: &mut TypeRegistry) {
        let int = registry.resolve(&i32::type_expr(), "Query.version");
        registry
            .register_root(OperationType::Query, object("Query", vec![("version", int)]))
            .unwrap();
    }

    #[test]
    fn test_builtins_are_seeded() {
        let mut registry = TypeRegistry::new();
        let int = registry.resolve(&i32::type_expr(), "test");
        let long = registry.resolve(&i64::type_expr(), "test");
        assert_eq!(int, long);
        assert_eq!(registry.name_of(int.named()), "Int");
        assert_eq!(registry.name_of(registry.index_of::<bool>().unwrap()), "Boolean");
        assert_eq!(registry.name_of(registry.index_of::<Id>().unwrap()), "ID");
    }

    #[test]
    fn test_nullability_follows_modifiers() {
        let mut registry = TypeRegistry::new();
        let int = registry.index_of::<i32>().unwrap();

        assert_eq!(
            registry.resolve(&i32::type_expr(), "test"),
            TypeRef::Named(int).non_null()
        );
        assert_eq!(
            registry.resolve(&Option::<i32>::type_expr(), "test"),
            TypeRef::Named(int)
        );
        assert_eq!(
            registry.resolve(&Vec::<Option<i32>>::type_expr(), "test"),
            TypeRef::Named(int).list().non_null()
        );
        assert_eq!(
            registry.resolve(&Option::<Vec<i32>>::type_expr(), "test"),
            TypeRef::Named(int).non_null().list()
        );
        assert_eq!(
            registry.resolve(&Option::<Vec<Option<Vec<i32>>>>::type_expr(), "test"),
            TypeRef::Named(int).non_null().list().list()
        );
    }

    #[test]
    fn test_alias_shares_the_named_type() {
        struct Remark;
        impl GraphType for Remark {}

        let mut registry = TypeRegistry::new();
        let comment = registry
            .register(AnyType::of::<Comment>(), object("Comment", vec![]))
            .unwrap()
            .unwrap();
        registry.alias(AnyType::of::<Remark>(), comment).unwrap();

        assert_eq!(registry.index_of::<Remark>(), Some(comment));
        assert_eq!(
            registry.resolve(&Option::<Remark>::type_expr(), "Query.remark"),
            TypeRef::Named(comment)
        );

        let err = registry.alias(AnyType::of::<Remark>(), comment).unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateRegistration { ref name, .. } if name == "Comment"));
        let err = registry.alias(AnyType::of::<i32>(), comment).unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateRegistration { ref name, .. } if name == "Int"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = TypeRegistry::new();
        registry
            .register(AnyType::of::<Comment>(), object("Comment", vec![]))
            .unwrap();
        let err = registry
            .register(AnyType::of::<Comment>(), object("Comment2", vec![]))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateRegistration { ref name, .. } if name == "Comment"));

        let err = registry
            .register(AnyType::of::<Node>(), object("Comment", vec![]))
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicateTypeName {
                name: "Comment".into()
            }
        );
    }

    #[test]
    fn test_unit_registration_is_noop() {
        let mut registry = TypeRegistry::new();
        assert_eq!(
            registry
                .register(AnyType::of::<()>(), object("Nothing", vec![]))
                .unwrap(),
            None
        );
        assert!(registry.lookup_name("Nothing").is_none());
    }

    #[test]
    fn test_self_reference_resolves_to_registration() {
        let mut registry = TypeRegistry::new();

        let replies = registry.resolve(&Vec::<TypeReference<Comment>>::type_expr(), "Comment.replies");
        let parent = registry.resolve(&Option::<Comment>::type_expr(), "Comment.parent");
        let index = registry
            .register(
                AnyType::of::<Comment>(),
                object("Comment", vec![("replies", replies.clone()), ("parent", parent.clone())]),
            )
            .unwrap()
            .unwrap();

        assert_eq!(replies.named(), index);
        assert_eq!(parent.named(), index);
        assert_eq!(registry.index_of::<Comment>(), Some(index));

        with_query(&mut registry);
        let schema = registry.finish().unwrap();
        assert_eq!(schema.type_by_name("Comment").map(|(i, _)| i), Some(index));
    }

    #[test]
    fn test_dangling_reference_is_fatal() {
        let mut registry = TypeRegistry::new();
        let ty = registry.resolve(&TypeReference::<Comment>::type_expr(), "Query.comment");
        registry
            .register_root(OperationType::Query, object("Query", vec![("comment", ty)]))
            .unwrap();

        let err = registry.finish().unwrap_err();
        assert_eq!(
            err,
            ConstructionError::UnresolvedReference {
                name: "Comment".into(),
                usage: "Query.comment".into(),
            }
        );
    }

    #[test]
    fn test_missing_query() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.finish().unwrap_err(), ConstructionError::MissingQuery);
    }

    #[test]
    fn test_duplicate_root() {
        let mut registry = TypeRegistry::new();
        with_query(&mut registry);
        let err = registry
            .register_root(OperationType::Query, object("Query2", vec![]))
            .unwrap_err();
        assert_eq!(err, ConstructionError::DuplicateRoot { root: "query" });
    }

    #[test]
    fn test_kind_checks() {
        let mut registry = TypeRegistry::new();
        registry
            .register(AnyType::of::<Comment>(), object("Comment", vec![]))
            .unwrap();

        let err = registry
            .get_interface_type(&Comment::type_expr(), "Post implements")
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::KindMismatch {
                usage: "Post implements".into(),
                name: "Comment".into(),
                expected: "an interface",
                found: "an object",
            }
        );

        let err = registry
            .get_interface_type(&Node::type_expr(), "Post implements")
            .unwrap_err();
        assert!(matches!(err, ConstructionError::Unregistered { ref name, .. } if name == "Node"));

        assert!(registry
            .get_input_type(&Comment::type_expr(), "Query.comment(filter:)")
            .is_err());
        assert!(registry
            .get_output_type(&Comment::type_expr(), "Query.comment")
            .is_ok());
    }

    #[test]
    fn test_pending_kind_check_runs_at_finish() {
        let mut registry = TypeRegistry::new();
        let ty = registry
            .get_output_type(&Filter::type_expr(), "Query.filter")
            .unwrap();
        registry
            .register(
                AnyType::of::<Filter>(),
                NamedType::InputObject(InputObjectType {
                    name: "Filter".into(),
                    description: None,
                    fields: IndexMap::new(),
                }),
            )
            .unwrap();
        registry
            .register_root(OperationType::Query, object("Query", vec![("filter", ty)]))
            .unwrap();

        let err = registry.finish().unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::KindMismatch { expected: "an output type", .. }
        ));
    }

    #[test]
    fn test_possible_types() {
        let mut registry = TypeRegistry::new();
        let node = registry
            .register(
                AnyType::of::<Node>(),
                NamedType::Interface(InterfaceType {
                    name: "Node".into(),
                    description: None,
                    fields: IndexMap::new(),
                }),
            )
            .unwrap()
            .unwrap();
        let interface = registry
            .get_interface_type(&Node::type_expr(), "Comment implements")
            .unwrap();
        assert_eq!(interface, node);

        let NamedType::Object(mut comment) = object("Comment", vec![]) else {
            unreachable!();
        };
        comment.interfaces.push(node);
        let comment = registry
            .register(AnyType::of::<Comment>(), NamedType::Object(comment))
            .unwrap()
            .unwrap();
        with_query(&mut registry);

        let schema = registry.finish().unwrap();
        assert_eq!(schema.possible_types(node), &[comment]);
        assert!(schema.is_possible_type(node, comment));
    }
}
