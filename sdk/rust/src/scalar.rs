//! Custom scalar types.

use crate::component::{BuildContext, Component};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use weft_core::{decode, encode, Map};
use weft_runtime::{
    AnyType, ConstructionError, FieldError, FieldResult, GraphType, NamedType, OpaqueValue,
    ParseValueFn, ScalarType,
};

type TypedSerializeFn<S> = Arc<dyn Fn(&S) -> FieldResult<Map> + Send + Sync>;

/// Declares the custom scalar backed by `S`.
///
/// Without overrides, values serialize through their serde encoding and
/// inputs are validated by decoding them into `S`. Literals are converted
/// to a `Map` and then parsed like variable values.
pub struct Scalar<S> {
    name: Option<String>,
    description: Option<String>,
    serialize: Option<TypedSerializeFn<S>>,
    parse_value: Option<ParseValueFn>,
}

impl<S> Default for Scalar<S>
where
    S: GraphType + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Scalar<S>
where
    S: GraphType + Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            serialize: None,
            parse_value: None,
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

    /// Overrides how values are serialized.
    #[must_use]
    pub fn serialize(
        mut self,
        serialize: impl Fn(&S) -> FieldResult<Map> + Send + Sync + 'static,
    ) -> Self {
        self.serialize = Some(Arc::new(serialize));
        self
    }

    /// Overrides how input values are validated and normalized.
    #[must_use]
    pub fn parse_value(
        mut self,
        parse_value: impl Fn(Map) -> FieldResult<Map> + Send + Sync + 'static,
    ) -> Self {
        self.parse_value = Some(Arc::new(parse_value));
        self
    }
}

impl<S> Component for Scalar<S>
where
    S: GraphType + Serialize + DeserializeOwned,
{
    fn kind(&self) -> &'static str {
        "scalar"
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(S::type_name)
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let name = self.name();

        let scalar_name = name.clone();
        let custom = self.serialize;
        let serialize = Arc::new(move |value: &OpaqueValue| match value.downcast_ref::<S>() {
            Some(value) => match &custom {
                Some(serialize) => serialize(value),
                None => encode(value).map_err(FieldError::from),
            },
            None => Err(FieldError::new(format!(
                "{scalar_name} cannot represent {}",
                value.type_name()
            ))),
        });

        let parse_value: ParseValueFn = self.parse_value.unwrap_or_else(|| {
            Arc::new(|value: Map| {
                let parsed: S = decode(value)?;
                Ok(encode(&parsed)?)
            })
        });
        let parse_literal = {
            let parse_value = Arc::clone(&parse_value);
            Arc::new(move |literal: &weft_syntax::Value, variables: &IndexMap<String, Map>| {
                parse_value(literal.to_map(variables))
            })
        };

        cx.registry().register(
            AnyType::of::<S>(),
            NamedType::Scalar(ScalarType {
                name,
                description: self.description,
                serialize,
                parse_value,
                parse_literal,
            }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::KeyPolicy;
    use serde::Deserialize;
    use weft_runtime::TypeRegistry;
    use weft_syntax::Value;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(transparent)]
    struct Url(String);
    impl GraphType for Url {}

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    struct Cents(u32);
    impl GraphType for Cents {}

    fn scalar<S: GraphType>(cx: &mut BuildContext) -> ScalarType {
        let index = cx.registry().index_of::<S>().unwrap();
        match cx.registry().get(index) {
            Some(NamedType::Scalar(scalar)) => scalar.clone(),
            _ => panic!("expected a scalar"),
        }
    }

    #[test]
    fn test_structural_defaults() {
        let mut cx = BuildContext::new(TypeRegistry::new(), KeyPolicy::default());
        Box::new(Scalar::<Url>::new().description("A URL"))
            .apply(&mut cx)
            .unwrap();

        let url = scalar::<Url>(&mut cx);
        assert_eq!(url.name, "Url");
        assert_eq!(
            (url.serialize)(&OpaqueValue::new(Url("https://a.b".into()))).unwrap(),
            Map::String("https://a.b".into())
        );
        assert_eq!(
            (url.parse_literal)(&Value::String("https://c.d".into()), &IndexMap::new()).unwrap(),
            Map::String("https://c.d".into())
        );
        assert!((url.parse_value)(Map::Int(3)).is_err());
        assert!((url.serialize)(&OpaqueValue::new(3_i32)).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut cx = BuildContext::new(TypeRegistry::new(), KeyPolicy::default());
        Box::new(
            Scalar::<Cents>::named("Money")
                .serialize(|cents: &Cents| Ok(Map::Double(f64::from(cents.0) / 100.0)))
                .parse_value(|value| match value.as_double() {
                    Some(amount) if amount >= 0.0 => Ok(value),
                    _ => Err(FieldError::new("Money must be a non-negative amount")),
                }),
        )
        .apply(&mut cx)
        .unwrap();

        let money = scalar::<Cents>(&mut cx);
        assert_eq!(money.name, "Money");
        assert_eq!(
            (money.serialize)(&OpaqueValue::new(Cents(250))).unwrap(),
            Map::Double(2.5)
        );
        assert!((money.parse_literal)(&Value::Float(-1.0), &IndexMap::new()).is_err());
        assert!((money.parse_literal)(&Value::Int(4), &IndexMap::new()).is_ok());
    }

    #[test]
    fn test_literal_reads_nested_variables() {
        let mut cx = BuildContext::new(TypeRegistry::new(), KeyPolicy::default());
        Box::new(Scalar::<Map>::named("Json")).apply(&mut cx).unwrap();
        let json = scalar::<Map>(&mut cx);

        let literal = Value::Object(
            [
                ("kind".to_string(), Value::String("user".into())),
                ("id".to_string(), Value::Variable("id".into())),
            ]
            .into_iter()
            .collect(),
        );
        let variables: IndexMap<String, Map> = [("id".to_string(), Map::from("7"))].into();

        let parsed = (json.parse_literal)(&literal, &variables).unwrap();
        assert_eq!(parsed.get("id"), Some(&Map::from("7")));
        assert_eq!(parsed.get("kind"), Some(&Map::from("user")));
    }
}
