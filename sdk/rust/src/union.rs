//! Union types.

use crate::component::{BuildContext, Component};
use std::marker::PhantomData;
use weft_runtime::{AnyType, ConstructionError, GraphType, NamedType, TypeExpr, UnionType};

/// Declares the union backed by `U`. Members must be declared before the
/// union.
pub struct Union<U> {
    name: Option<String>,
    description: Option<String>,
    members: Vec<TypeExpr>,
    _marker: PhantomData<fn(&U)>,
}

impl<U: GraphType> Default for Union<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: GraphType> Union<U> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

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

    /// Adds the object type backed by `T` as a member.
    #[must_use]
    pub fn member<T: GraphType>(mut self) -> Self {
        self.members.push(T::type_expr());
        self
    }
}

impl<U: GraphType> Component for Union<U> {
    fn kind(&self) -> &'static str {
        "union"
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(U::type_name)
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let name = self.name();
        let registry = cx.registry();
        let usage = format!("union `{name}`");
        let members = self
            .members
            .iter()
            .map(|member| registry.get_object_type(member, &usage))
            .collect::<Result<Vec<_>, _>>()?;

        registry.register(
            AnyType::of::<U>(),
            NamedType::Union(UnionType {
                name,
                description: self.description,
                members,
            }),
        )?;
        Ok(())
    }
}
