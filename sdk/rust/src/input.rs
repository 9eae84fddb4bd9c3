//! Input object types.

use crate::component::{BuildContext, Component};
use crate::field::InputField;
use indexmap::IndexMap;
use std::marker::PhantomData;
use weft_runtime::{AnyType, ConstructionError, GraphType, InputObjectType, NamedType};

/// Declares the input object backed by `I`.
///
/// Input values reach resolvers as part of their decoded arguments, so `I`
/// usually derives `Deserialize` with the same field names.
pub struct Input<I> {
    name: Option<String>,
    description: Option<String>,
    fields: Vec<InputField>,
    _marker: PhantomData<fn() -> I>,
}

impl<I: GraphType> Default for Input<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: GraphType> Input<I> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            fields: Vec::new(),
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

    #[must_use]
    pub fn field(mut self, field: InputField) -> Self {
        self.fields.push(field);
        self
    }
}

impl<I: GraphType> Component for Input<I> {
    fn kind(&self) -> &'static str {
        "input"
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(I::type_name)
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let name = self.name();
        let registry = cx.registry();

        let mut fields = IndexMap::with_capacity(self.fields.len());
        for field in self.fields {
            if fields.contains_key(field.name()) {
                return Err(ConstructionError::DuplicateField {
                    owner: name,
                    field: field.name().to_string(),
                });
            }
            let usage = format!("{name}.{}", field.name());
            let value = field.build(registry, &usage)?;
            fields.insert(value.name.clone(), value);
        }

        registry.register(
            AnyType::of::<I>(),
            NamedType::InputObject(InputObjectType {
                name,
                description: self.description,
                fields,
            }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::KeyPolicy;
    use crate::object::Type;
    use weft_core::Map;
    use weft_runtime::TypeRegistry;

    struct CommentFilter;
    impl GraphType for CommentFilter {}

    struct Comment;
    impl GraphType for Comment {}

    struct Bad;
    impl GraphType for Bad {}

    #[test]
    fn test_registers_fields_with_defaults() {
        let mut cx = BuildContext::new(TypeRegistry::new(), KeyPolicy::default());
        Box::new(
            Input::<CommentFilter>::new()
                .field(InputField::new::<Option<String>>("author"))
                .field(InputField::new::<i32>("limit").default_value(10)),
        )
        .apply(&mut cx)
        .unwrap();

        let registry = cx.registry();
        let index = registry.index_of::<CommentFilter>().unwrap();
        let Some(NamedType::InputObject(input)) = registry.get(index) else {
            panic!("expected an input object");
        };
        assert_eq!(input.fields.keys().collect::<Vec<_>>(), ["author", "limit"]);
        assert!(!input.fields["author"].ty.is_non_null());
        assert_eq!(input.fields["limit"].default_value, Some(Map::Int(10)));
    }

    #[test]
    fn test_duplicate_field() {
        let mut cx = BuildContext::new(TypeRegistry::new(), KeyPolicy::default());
        let error = Box::new(
            Input::<CommentFilter>::new()
                .field(InputField::new::<i32>("limit"))
                .field(InputField::new::<i32>("limit")),
        )
        .apply(&mut cx)
        .unwrap_err();
        assert_eq!(
            error,
            ConstructionError::DuplicateField {
                owner: "CommentFilter".into(),
                field: "limit".into(),
            }
        );
    }

    #[test]
    fn test_rejects_output_field_type() {
        let mut cx = BuildContext::new(TypeRegistry::new(), KeyPolicy::default());
        Box::new(Type::<Comment>::new()).apply(&mut cx).unwrap();
        let error = Box::new(Input::<Bad>::new().field(InputField::new::<Comment>("comment")))
            .apply(&mut cx)
            .unwrap_err();
        assert!(matches!(
            error,
            ConstructionError::KindMismatch { ref usage, .. } if usage == "Bad.comment"
        ));
    }
}
