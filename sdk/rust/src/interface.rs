//! Interface types.

use crate::component::{BuildContext, Component};
use crate::field::{build_fields, Field};
use weft_runtime::{AnyType, ConstructionError, GraphType, InterfaceType, NamedType};

/// Declares the interface backed by `I`.
///
/// Values are dispatched to an implementing object by each object's runtime
/// type test, so a resolver returning an interface must hand back the
/// concrete object. For an enum over the implementors, do that in
/// [`GraphType::into_resolved`].
pub struct Interface<I, Ctx = ()> {
    name: Option<String>,
    description: Option<String>,
    fields: Vec<Field<I, Ctx>>,
}

impl<I, Ctx> Default for Interface<I, Ctx>
where
    I: GraphType,
    Ctx: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, Ctx> Interface<I, Ctx>
where
    I: GraphType,
    Ctx: Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            fields: Vec::new(),
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

    #[must_use]
    pub fn field(mut self, field: Field<I, Ctx>) -> Self {
        self.fields.push(field);
        self
    }
}

impl<I, Ctx> Component for Interface<I, Ctx>
where
    I: GraphType,
    Ctx: Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        "interface"
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(I::type_name)
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let name = self.name();
        let registry = cx.registry();
        let fields = build_fields(registry, &name, self.fields)?;
        registry.register(
            AnyType::of::<I>(),
            NamedType::Interface(InterfaceType {
                name,
                description: self.description,
                fields,
            }),
        )?;
        Ok(())
    }
}
