//! Coders between `Map` and strongly-typed host values.
//!
//! Encoding goes through serde's data model, so any `Serialize` type can be
//! turned into a `Map` and any `DeserializeOwned` type can be decoded from one.

use crate::map::Map;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error raised while translating between `Map` and a host value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoderError {
    #[error("failed to encode `{target}`: {message}")]
    Encode {
        target: &'static str,
        message: String,
    },

    #[error("failed to decode `{target}`: {message}")]
    Decode {
        target: &'static str,
        message: String,
    },
}

/// Encodes a host value into a `Map`.
///
/// # Errors
///
/// Returns [`CoderError::Encode`] when the value's `Serialize` impl fails,
/// e.g. for maps with non-string keys.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Map, CoderError> {
    serde_json::to_value(value)
        .map(Map::from)
        .map_err(|e| CoderError::Encode {
            target: std::any::type_name::<T>(),
            message: e.to_string(),
        })
}

/// Decodes a `Map` into a host value.
///
/// # Errors
///
/// Returns [`CoderError::Decode`] when the map does not have the shape the
/// target type expects.
pub fn decode<T: DeserializeOwned>(map: Map) -> Result<T, CoderError> {
    serde_json::from_value(serde_json::Value::from(map)).map_err(|e| CoderError::Decode {
        target: std::any::type_name::<T>(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Page {
        first: Option<u32>,
        after: Option<String>,
    }

    #[test]
    fn test_scalars_round_trip() {
        assert_eq!(encode(&42_i64).unwrap(), Map::Int(42));
        assert_eq!(decode::<i64>(Map::Int(42)).unwrap(), 42);

        assert_eq!(encode(&2.5_f64).unwrap(), Map::Double(2.5));
        assert_eq!(decode::<f64>(Map::Double(2.5)).unwrap(), 2.5);

        assert_eq!(encode("hello").unwrap(), Map::String("hello".into()));
        assert_eq!(decode::<String>(Map::String("hello".into())).unwrap(), "hello");

        assert_eq!(encode(&true).unwrap(), Map::Bool(true));
        assert!(decode::<bool>(Map::Bool(true)).unwrap());
    }

    #[test]
    fn test_decode_struct_from_object() {
        let mut args = Map::object();
        args.insert("first", 1);
        args.insert("after", "MQ==");

        let page: Page = decode(args).unwrap();
        assert_eq!(
            page,
            Page {
                first: Some(1),
                after: Some("MQ==".to_string()),
            }
        );
    }

    #[test]
    fn test_decode_reports_target() {
        let mut args = Map::object();
        args.insert("first", -1);

        let err = decode::<Page>(args).unwrap_err();
        assert!(matches!(err, CoderError::Decode { .. }));
        assert!(err.to_string().contains("Page"));
    }

    #[test]
    fn test_int_does_not_decode_as_string() {
        assert!(decode::<String>(Map::Int(1)).is_err());
    }
}
