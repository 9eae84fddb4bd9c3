//! Typed error codes for field errors raised by the SDK.

use serde::{Deserialize, Serialize};
use std::fmt;
use weft_runtime::{FieldError, FieldResult};

/// Error codes attached to field errors under `extensions.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    /// The request document failed to parse.
    ParseError,
    /// Arguments or representations did not decode.
    DeserializeError,
    /// Arguments decoded but are out of range.
    BadUserInput,
    /// A source or context value had the wrong type.
    InternalError,
    /// A resolver returned an error.
    ResolverError,
    /// A requested entity does not exist.
    NotFound,
    /// The request could not run at all.
    ExecutionError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "PARSE_ERROR",
            Self::DeserializeError => "DESERIALIZE_ERROR",
            Self::BadUserInput => "BAD_USER_INPUT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ResolverError => "RESOLVER_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::ExecutionError => "EXECUTION_ERROR",
        }
    }

    /// Returns true if the client caused the error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ParseError | Self::DeserializeError | Self::BadUserInput | Self::NotFound
        )
    }

    /// Creates a field error carrying this code.
    pub fn error(self, message: impl Into<String>) -> FieldError {
        FieldError::new(message).with_code(self.as_str())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result extension for turning foreign errors into coded field errors.
pub trait ResultExt<T> {
    /// Maps the error to a field error with the given code.
    ///
    /// # Errors
    ///
    /// Returns the mapped error if `self` is an error.
    fn map_field_err(self, code: ErrorCode) -> FieldResult<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for Result<T, E> {
    fn map_field_err(self, code: ErrorCode) -> FieldResult<T> {
        self.map_err(|e| code.error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::Map;

    #[test]
    fn test_error_code_properties() {
        assert!(ErrorCode::ParseError.is_client_error());
        assert!(!ErrorCode::InternalError.is_client_error());
        assert_eq!(ErrorCode::NotFound.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_coded_error() {
        let error = ErrorCode::DeserializeError.error("bad input");
        assert_eq!(error.message, "bad input");
        assert_eq!(
            error.extensions.get("code"),
            Some(&Map::String("DESERIALIZE_ERROR".into()))
        );
    }

    #[test]
    fn test_result_ext() {
        let result: Result<i32, std::num::ParseIntError> = "x".parse::<i32>();
        let error = result.map_field_err(ErrorCode::ResolverError).unwrap_err();
        assert_eq!(
            error.extensions.get("code"),
            Some(&Map::String("RESOLVER_ERROR".into()))
        );
    }
}
