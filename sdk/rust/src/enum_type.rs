//! Enum types.
//!
//! Enum values are native Rust values whose serde encoding is a string,
//! typically unit variants with `#[serde(rename_all = "SCREAMING_SNAKE_CASE")]`.
//! That encoding is the schema name of the value.

use crate::component::{BuildContext, Component};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use weft_core::{encode, Map};
use weft_runtime::{
    AnyType, ConstructionError, EnumType, EnumValueDefinition, FieldError, GraphType, NamedType,
    OpaqueValue,
};

/// One declared enum value.
pub struct EnumValue<E> {
    value: E,
    description: Option<String>,
    deprecation_reason: Option<String>,
}

impl<E> EnumValue<E> {
    pub fn new(value: E) -> Self {
        Self {
            value,
            description: None,
            deprecation_reason: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }
}

/// Declares the enum backed by `E`.
pub struct Enum<E> {
    name: Option<String>,
    description: Option<String>,
    values: Vec<EnumValue<E>>,
}

impl<E> Default for Enum<E>
where
    E: GraphType + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Enum<E>
where
    E: GraphType + Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            values: Vec::new(),
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
    pub fn value(mut self, value: EnumValue<E>) -> Self {
        self.values.push(value);
        self
    }

    /// Declares several values without metadata.
    #[must_use]
    pub fn values(mut self, values: impl IntoIterator<Item = E>) -> Self {
        self.values.extend(values.into_iter().map(EnumValue::new));
        self
    }
}

impl<E> Component for Enum<E>
where
    E: GraphType + Serialize + DeserializeOwned,
{
    fn kind(&self) -> &'static str {
        "enum"
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(E::type_name)
    }

    fn apply(self: Box<Self>, cx: &mut BuildContext) -> Result<(), ConstructionError> {
        let name = self.name();
        let mut values = IndexMap::with_capacity(self.values.len());

        for value in self.values {
            let key = match encode(&value.value) {
                Ok(Map::String(key)) => key,
                Ok(other) => {
                    return Err(ConstructionError::InvalidEnumValue {
                        name,
                        found: other.to_string(),
                    })
                }
                Err(error) => {
                    return Err(ConstructionError::InvalidEnumValue {
                        name,
                        found: error.to_string(),
                    })
                }
            };
            if values.contains_key(&key) {
                return Err(ConstructionError::DuplicateEnumValue { name, value: key });
            }
            values.insert(
                key.clone(),
                EnumValueDefinition {
                    name: key,
                    description: value.description,
                    deprecation_reason: value.deprecation_reason,
                },
            );
        }

        let known: FxHashSet<String> = values.keys().cloned().collect();
        let enum_name = name.clone();
        let serialize = Arc::new(move |value: &OpaqueValue| {
            let Some(value) = value.downcast_ref::<E>() else {
                return Err(FieldError::new(format!(
                    "Enum `{enum_name}` cannot represent {}",
                    value.type_name()
                )));
            };
            match encode(value)? {
                Map::String(key) if known.contains(&key) => Ok(Map::String(key)),
                other => Err(FieldError::new(format!(
                    "{other} is not a value of enum `{enum_name}`"
                ))),
            }
        });

        cx.registry().register(
            AnyType::of::<E>(),
            NamedType::Enum(EnumType {
                name,
                description: self.description,
                values,
                serialize,
            }),
        )?;
        Ok(())
    }
}
