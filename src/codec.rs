//! JSON codec for persisted records.
//!
//! Thin wrappers over `serde_json` that report failures as [`CodecError`]
//! instead of panicking or falling back to defaults. Schema validation is
//! carried by the record types themselves: unknown fields, out-of-range
//! progress, and unknown status codes are all rejected on decode.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Error returned when a record cannot be encoded or decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The value could not be serialized.
    #[error("failed to encode JSON: {0}")]
    Encode(String),

    /// The document is not valid JSON for the target type.
    #[error("failed to decode JSON at line {line}, column {column}: {message}")]
    Decode {
        /// Error description from the parser.
        message: String,
        /// One-based line of the failure.
        line: usize,
        /// One-based column of the failure.
        column: usize,
    },
}

impl CodecError {
    fn decode(err: &serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// Encodes a value as compact JSON.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Encodes a value as indented JSON.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when serialization fails.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string_pretty(value).map_err(|err| CodecError::Encode(err.to_string()))
}

/// Decodes a value from JSON text.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the text is malformed or does not
/// satisfy the target type's schema.
pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(|err| CodecError::decode(&err))
}
