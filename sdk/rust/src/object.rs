//! Object types.

use crate::component::{BuildContext, Component};
use crate::federation::{Entity, Key, KeyPolicy};
use crate::field::{build_fields, Field};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;
use weft_runtime::{
    AnyType, ConstructionError, GraphType, IsInstanceFn, NamedType, ObjectType, OpaqueValue,
    TypeExpr,
};

/// Declares the object type backed by `T`.
///
/// ```ignore
/// Type::<Comment, Context>::new()
///     .description("A comment on a post")
///     .implements::<Node>()
///     .field(Field::new("id", |c: &Comment| c.id))
///     .field(Field::new("message", |c: &Comment| c.message.clone()))
/// ```
pub struct Type<T, Ctx = ()> {
    name: Option<String>,
    description: Option<String>,
    interfaces: Vec<TypeExpr>,
    fields: Vec<Field<T, Ctx>>,
    keys: Vec<Key<T, Ctx>>,
    is_instance: Option<IsInstanceFn>,
    _marker: PhantomData<fn(&T, &Ctx)>,
}

impl<T, Ctx> Default for Type<T, Ctx>
where
    T: GraphType,
    Ctx: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Ctx> Type<T, Ctx>
where
    T: GraphType,
    Ctx: Send + Sync + 'static,
{
    /// Creates an object type named after `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            keys: Vec::new(),
            is_instance: None,
            _marker: PhantomData,
        }
    }

    /// Creates an object type with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares that the type implements the interface backed by `I`. The
    /// interface must be declared before this type.
    #[must_use]
    pub fn implements<I: GraphType>(mut self) -> Self {
        self.interfaces.push(I::type_expr());
        self
    }

    #[must_use]
    pub fn field(mut self, field: Field<T, Ctx>) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a federation key.
    #[must_use]
    pub fn key(mut self, key: Key<T, Ctx>) -> Self {
        self.keys.push(key);
        self
    }

    /// Replaces the runtime type test used for interface and union
    /// dispatch. Defaults to checking the value is a `T`.
    #[must_use]
    pub fn is_instance(
        mut self,
        is_instance: impl Fn(&OpaqueValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_instance = Some(Arc::new(is_instance));
        self
    }
}

impl<T, Ctx> Component for Type<T, Ctx>
where
    T: GraphType,
    Ctx: Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        "type"
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(T::type_name)
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let name = self.name();
        let this = *self;
        let registry = cx.registry();

        let usage = format!("`{name}` implements");
        let interfaces = this
            .interfaces
            .iter()
            .map(|interface| registry.get_interface_type(interface, &usage))
            .collect::<Result<Vec<_>, _>>()?;

        let fields = build_fields(registry, &name, this.fields)?;

        let mut entity_keys = Vec::with_capacity(this.keys.len());
        for key in this.keys {
            entity_keys.push(key.build(registry, &name, &fields)?);
        }
        if cx.key_policy() == KeyPolicy::RejectAmbiguous {
            reject_ambiguous(&name, &entity_keys)?;
        }

        let object = ObjectType {
            name: name.clone(),
            description: this.description,
            fields,
            interfaces,
            is_instance: this
                .is_instance
                .unwrap_or_else(|| Arc::new(|value: &OpaqueValue| value.is::<T>())),
            keys: entity_keys.iter().map(|key| key.fields.join(" ")).collect(),
        };

        let index = cx
            .registry()
            .register(AnyType::of::<T>(), NamedType::Object(object))?;

        if let Some(index) = index {
            if !entity_keys.is_empty() {
                debug!(entity = %name, keys = entity_keys.len(), "registered federated entity");
                cx.add_entity(Entity {
                    type_name: name,
                    index,
                    keys: entity_keys,
                });
            }
        }
        Ok(())
    }
}

/// Rejects keys that share a field.
fn reject_ambiguous(
    type_name: &str,
    keys: &[crate::federation::EntityKey],
) -> Result<(), ConstructionError> {
    for (i, first) in keys.iter().enumerate() {
        for second in &keys[i + 1..] {
            if first.fields.iter().any(|field| second.fields.contains(field)) {
                return Err(ConstructionError::AmbiguousKeys {
                    type_name: type_name.to_string(),
                    first: first.fields.join(" "),
                    second: second.fields.join(" "),
                });
            }
        }
    }
    Ok(())
}
