//! Built-in scalars: `Int`, `Float`, `String`, `Boolean` and `ID`.

use crate::error::{FieldError, FieldResult};
use crate::graph_type::Id;
use crate::resolve::OpaqueValue;
use crate::types::ScalarType;
use indexmap::IndexMap;
use std::sync::Arc;
use weft_core::Map;
use weft_syntax::Value;

/// Names of the built-in scalars, in registration order.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

fn scalar(
    name: &str,
    description: &str,
    serialize: fn(&OpaqueValue) -> FieldResult<Map>,
    parse_value: fn(Map) -> FieldResult<Map>,
    parse_literal: fn(&Value) -> FieldResult<Map>,
) -> ScalarType {
    ScalarType {
        name: name.to_string(),
        description: Some(description.to_string()),
        serialize: Arc::new(serialize),
        parse_value: Arc::new(parse_value),
        parse_literal: Arc::new(move |literal: &Value, _: &IndexMap<String, Map>| {
            parse_literal(literal)
        }),
    }
}

fn cannot_represent(scalar: &str, what: impl std::fmt::Display) -> FieldError {
    FieldError::new(format!("{scalar} cannot represent {what}"))
}

macro_rules! try_downcast {
    ($value:expr, $map:expr, $($ty:ty),+) => {
        $(
            if let Some(v) = $value.downcast_ref::<$ty>() {
                return Ok($map(v));
            }
        )+
    };
}

/// The `Int` scalar, backed by every integer width up to `i64`.
#[must_use]
pub fn int() -> ScalarType {
    scalar(
        "Int",
        "The `Int` scalar type represents non-fractional signed whole numeric values.",
        |value| {
            try_downcast!(value, |v: &i32| Map::Int(i64::from(*v)), i32);
            try_downcast!(value, |v: &i16| Map::Int(i64::from(*v)), i16);
            try_downcast!(value, |v: &i8| Map::Int(i64::from(*v)), i8);
            try_downcast!(value, |v: &u8| Map::Int(i64::from(*v)), u8);
            try_downcast!(value, |v: &u16| Map::Int(i64::from(*v)), u16);
            let wide = value
                .downcast_ref::<i64>()
                .copied()
                .or_else(|| value.downcast_ref::<u32>().copied().map(i64::from));
            match wide {
                Some(v) if i32::try_from(v).is_ok() => Ok(Map::Int(v)),
                Some(v) => Err(cannot_represent("Int", format!("non 32-bit integer value: {v}"))),
                None => Err(cannot_represent("Int", value.type_name())),
            }
        },
        |value| match value {
            Map::Int(i) if i32::try_from(i).is_ok() => Ok(value),
            Map::Int(i) => Err(cannot_represent("Int", format!("non 32-bit integer value: {i}"))),
            other => Err(cannot_represent("Int", format!("non-integer value: {other}"))),
        },
        |literal| match literal {
            Value::Int(i) if i32::try_from(*i).is_ok() => Ok(Map::Int(*i)),
            Value::Int(i) => Err(cannot_represent("Int", format!("non 32-bit integer value: {i}"))),
            _ => Err(cannot_represent("Int", "a non-integer literal")),
        },
    )
}

/// The `Float` scalar, backed by `f32` and `f64`.
#[must_use]
pub fn float() -> ScalarType {
    scalar(
        "Float",
        "The `Float` scalar type represents signed double-precision fractional values.",
        |value| {
            try_downcast!(value, |v: &f64| Map::Double(*v), f64);
            try_downcast!(value, |v: &f32| Map::Double(f64::from(*v)), f32);
            Err(cannot_represent("Float", value.type_name()))
        },
        |value| {
            value
                .as_double()
                .map(Map::Double)
                .ok_or_else(|| cannot_represent("Float", format!("non-numeric value: {value}")))
        },
        |literal| match literal {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(Map::Double(*i as f64)),
            Value::Float(f) => Ok(Map::Double(*f)),
            _ => Err(cannot_represent("Float", "a non-numeric literal")),
        },
    )
}

/// The `String` scalar.
#[must_use]
pub fn string() -> ScalarType {
    scalar(
        "String",
        "The `String` scalar type represents textual data.",
        |value| {
            try_downcast!(value, |v: &String| Map::String(v.clone()), String);
            try_downcast!(value, |v: &&'static str| Map::String((*v).to_string()), &'static str);
            Err(cannot_represent("String", value.type_name()))
        },
        |value| match value {
            Map::String(_) => Ok(value),
            other => Err(cannot_represent("String", format!("a non-string value: {other}"))),
        },
        |literal| match literal {
            Value::String(s) => Ok(Map::String(s.clone())),
            _ => Err(cannot_represent("String", "a non-string literal")),
        },
    )
}

/// The `Boolean` scalar.
#[must_use]
pub fn boolean() -> ScalarType {
    scalar(
        "Boolean",
        "The `Boolean` scalar type represents `true` or `false`.",
        |value| {
            try_downcast!(value, |v: &bool| Map::Bool(*v), bool);
            Err(cannot_represent("Boolean", value.type_name()))
        },
        |value| match value {
            Map::Bool(_) => Ok(value),
            other => Err(cannot_represent("Boolean", format!("a non-boolean value: {other}"))),
        },
        |literal| match literal {
            Value::Boolean(b) => Ok(Map::Bool(*b)),
            _ => Err(cannot_represent("Boolean", "a non-boolean literal")),
        },
    )
}

/// The `ID` scalar, accepting strings and integers.
#[must_use]
pub fn id() -> ScalarType {
    scalar(
        "ID",
        "The `ID` scalar type represents a unique identifier.",
        |value| {
            try_downcast!(value, |v: &Id| Map::String(v.0.clone()), Id);
            try_downcast!(value, |v: &String| Map::String(v.clone()), String);
            try_downcast!(value, |v: &i32| Map::String(v.to_string()), i32);
            try_downcast!(value, |v: &i64| Map::String(v.to_string()), i64);
            Err(cannot_represent("ID", value.type_name()))
        },
        |value| match value {
            Map::String(_) => Ok(value),
            Map::Int(i) => Ok(Map::String(i.to_string())),
            other => Err(cannot_represent("ID", format!("value: {other}"))),
        },
        |literal| match literal {
            Value::String(s) => Ok(Map::String(s.clone())),
            Value::Int(i) => Ok(Map::String(i.to_string())),
            _ => Err(cannot_represent("ID", "a non-string and non-integer literal")),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_serializes_all_widths() {
        let int = int();
        assert_eq!((int.serialize)(&OpaqueValue::new(7_i32)).unwrap(), Map::Int(7));
        assert_eq!((int.serialize)(&OpaqueValue::new(7_u8)).unwrap(), Map::Int(7));
        assert_eq!((int.serialize)(&OpaqueValue::new(7_i64)).unwrap(), Map::Int(7));
        assert!((int.serialize)(&OpaqueValue::new("7".to_string())).is_err());
    }

    #[test]
    fn test_int_rejects_values_outside_32_bits() {
        let int = int();
        let max = i64::from(i32::MAX);
        assert_eq!((int.serialize)(&OpaqueValue::new(max)).unwrap(), Map::Int(max));
        assert!((int.serialize)(&OpaqueValue::new(max + 1)).is_err());
        assert!((int.serialize)(&OpaqueValue::new(i64::from(i32::MIN) - 1)).is_err());
        assert!((int.serialize)(&OpaqueValue::new(u32::MAX)).is_err());
        assert!((int.parse_value)(Map::Int(max + 1)).is_err());
        assert!((int.parse_literal)(&Value::Int(max + 1), &IndexMap::new()).is_err());
    }

    #[test]
    fn test_float_accepts_integers() {
        let float = float();
        assert_eq!((float.parse_value)(Map::Int(2)).unwrap(), Map::Double(2.0));
        assert_eq!(
            (float.parse_literal)(&Value::Float(2.5), &IndexMap::new()).unwrap(),
            Map::Double(2.5)
        );
        assert!((float.parse_value)(Map::String("2".into())).is_err());
    }

    #[test]
    fn test_id_normalizes_to_string() {
        let id = id();
        assert_eq!(
            (id.parse_value)(Map::Int(4)).unwrap(),
            Map::String("4".into())
        );
        assert_eq!(
            (id.serialize)(&OpaqueValue::new(Id::new("abc"))).unwrap(),
            Map::String("abc".into())
        );
    }

    #[test]
    fn test_string_rejects_other_literals() {
        let string = string();
        assert!((string.parse_literal)(&Value::Int(1), &IndexMap::new()).is_err());
        assert_eq!(
            (string.parse_literal)(&Value::String("x".into()), &IndexMap::new()).unwrap(),
            Map::String("x".into())
        );
    }
}
