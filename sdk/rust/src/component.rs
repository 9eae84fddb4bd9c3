//! The component tree.
//!
//! Every declared schema element is a [`Component`]. The builder applies
//! components in declaration order against a [`BuildContext`], which owns
//! the type registry and collects root fields and federated entities until
//! the schema is frozen.

use crate::federation::{Entity, KeyPolicy};
use indexmap::IndexMap;
use weft_runtime::{ConstructionError, FieldDefinition, TypeRegistry};
use weft_syntax::OperationType;

/// A declared schema element.
pub trait Component {
    /// The kind of element, for diagnostics.
    fn kind(&self) -> &'static str;

    /// The schema name the element declares.
    fn name(&self) -> String;

    /// Registers the element.
    ///
    /// # Errors
    ///
    /// Returns the first construction error; the schema is not built.
    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError>;
}

/// Fields and description collected for one root operation type.
#[derive(Default)]
pub(crate) struct RootFields {
    pub(crate) description: Option<String>,
    pub(crate) fields: IndexMap<String, FieldDefinition>,
}

/// State shared by components while a schema is being built.
pub struct BuildContext {
    pub(crate) registry: TypeRegistry,
    pub(crate) query: RootFields,
    pub(crate) mutation: RootFields,
    pub(crate) subscription: RootFields,
    pub(crate) entities: Vec<Entity>,
    key_policy: KeyPolicy,
}

impl BuildContext {
    pub(crate) fn new(registry: TypeRegistry, key_policy: KeyPolicy) -> Self {
        Self {
            registry,
            query: RootFields::default(),
            mutation: RootFields::default(),
            subscription: RootFields::default(),
            entities: Vec::new(),
            key_policy,
        }
    }

    /// The registry being built.
    pub fn registry(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// How overlapping federation keys are treated.
    #[must_use]
    pub fn key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    fn root_mut(&mut self, operation: OperationType) -> &mut RootFields {
        match operation {
            OperationType::Query => &mut self.query,
            OperationType::Mutation => &mut self.mutation,
            OperationType::Subscription => &mut self.subscription,
        }
    }

    /// Adds a field to a root operation type. Roots declared by several
    /// components merge into one object.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::DuplicateField`] if the root already has
    /// a field with that name.
    pub fn add_root_field(
        &mut self,
        operation: OperationType,
        field: FieldDefinition,
    ) -> Result<(), ConstructionError> {
        let root = self.root_mut(operation);
        if root.fields.contains_key(&field.name) {
            return Err(ConstructionError::DuplicateField {
                owner: root_name(operation).to_string(),
                field: field.name,
            });
        }
        root.fields.insert(field.name.clone(), field);
        Ok(())
    }

    /// Sets the description of a root operation type, unless one is set.
    pub fn describe_root(&mut self, operation: OperationType, description: String) {
        self.root_mut(operation).description.get_or_insert(description);
    }

    pub(crate) fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }
}

/// The fixed type name of a root operation type.
#[must_use]
pub const fn root_name(operation: OperationType) -> &'static str {
    match operation {
        OperationType::Query => "Query",
        OperationType::Mutation => "Mutation",
        OperationType::Subscription => "Subscription",
    }
}
