//! Root operation types and bare type lists.

use crate::component::{root_name, BuildContext, Component};
use crate::field::Field;
use weft_runtime::{ConstructionError, GraphType, TypeExpr};
use weft_syntax::OperationType;

macro_rules! root_component {
    ($(#[$doc:meta])* $ty:ident => $operation:expr, $kind:literal) => {
        $(#[$doc])*
        pub struct $ty<Root = (), Ctx = ()> {
            description: Option<String>,
            fields: Vec<Field<Root, Ctx>>,
        }

        impl<Root, Ctx> Default for $ty<Root, Ctx>
        where
            Root: Send + Sync + 'static,
            Ctx: Send + Sync + 'static,
        {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<Root, Ctx> $ty<Root, Ctx>
        where
            Root: Send + Sync + 'static,
            Ctx: Send + Sync + 'static,
        {
            #[must_use]
            pub fn new() -> Self {
                Self {
                    description: None,
                    fields: Vec::new(),
                }
            }

            #[must_use]
            pub fn description(mut self, description: impl Into<String>) -> Self {
                self.description = Some(description.into());
                self
            }

            #[must_use]
            pub fn field(mut self, field: Field<Root, Ctx>) -> Self {
                self.fields.push(field);
                self
            }
        }

        impl<Root, Ctx> Component for $ty<Root, Ctx>
        where
            Root: Send + Sync + 'static,
            Ctx: Send + Sync + 'static,
        {
            fn kind(&self) -> &'static str {
                $kind
            }

            fn name(&self) -> String {
                root_name($operation).to_string()
            }

            fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
                apply_root(cx, $operation, self.description, self.fields)
            }
        }
    };
}

root_component!(
    /// Fields of the `Query` root. Several `Query` components merge into
    /// one root type.
    Query => OperationType::Query, "query"
);
root_component!(
    /// Fields of the `Mutation` root. Top-level mutation fields run one
    /// after another.
    Mutation => OperationType::Mutation, "mutation"
);
root_component!(
    /// Fields of the `Subscription` root. They are part of the schema and
    /// its SDL; the bundled executor does not run subscriptions.
    Subscription => OperationType::Subscription, "subscription"
);

fn apply_root<Root, Ctx>(
    cx: &mut BuildContext,
    operation: OperationType,
    description: Option<String>,
    fields: Vec<Field<Root, Ctx>>,
) -> Result<(), ConstructionError>
where
    Root: Send + Sync + 'static,
    Ctx: Send + Sync + 'static,
{
    let owner = root_name(operation);
    for field in fields {
        let definition = field.build(cx.registry(), owner)?;
        cx.add_root_field(operation, definition)?;
    }
    if let Some(description) = description {
        cx.describe_root(operation, description);
    }
    Ok(())
}

/// Requires a set of types to be part of the schema.
///
/// Useful for object types that are only ever reached through an interface
/// or union: listing them makes a missing declaration a construction error
/// rather than a runtime dispatch failure.
#[derive(Default)]
pub struct Types {
    types: Vec<TypeExpr>,
}

impl Types {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add<T: GraphType>(mut self) -> Self {
        self.types.push(T::type_expr());
        self
    }
}

impl Component for Types {
    fn kind(&self) -> &'static str {
        "types"
    }

    fn name(&self) -> String {
        self.types
            .iter()
            .map(TypeExpr::leaf_name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let registry = cx.registry();
        for ty in &self.types {
            registry.resolve(ty, "type list");
        }
        Ok(())
    }
}
