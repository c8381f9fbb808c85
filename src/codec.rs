//! JSON codec: the single place where raw body bytes become typed values
//! and handler payloads become wire bytes.
//!
//! Decoding is strict about required fields (a missing field is a hard
//! failure) and forgiving about unknown ones (extra fields are ignored),
//! which keeps payloads forward-compatible. Encoding is total for any value
//! assembled from this crate's own data model.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure to turn request bytes into a typed value.
///
/// Covers both malformed JSON and well-formed JSON that is missing a
/// required field; serde's message carries the reason either way.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct DecodeError {
    #[from]
    source: serde_json::Error,
}

/// Decode `bytes` into `T`.
///
/// Unknown extra fields are ignored; missing required fields fail.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode a value into JSON bytes.
///
/// Total for values composed of strings, numbers and nested maps/sequences,
/// which is everything this crate's handlers produce.
#[allow(clippy::expect_used)]
pub fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("JSON encoding of an in-memory value cannot fail")
}

/// Convert a serializable value into a [`Value`] tree.
#[allow(clippy::expect_used)]
pub fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("JSON encoding of an in-memory value cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::types::{Info, Person};

    #[test]
    fn decodes_info_with_required_field() {
        let info: Info = decode(br#"{"name":"John"}"#).unwrap();
        assert_eq!(info.name, "John");
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let err = decode::<Info>(b"{}").unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let info: Info = decode(br#"{"name":"John","shoe_size":46}"#).unwrap();
        assert_eq!(info.name, "John");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode::<Info>(b"{not json").is_err());
        assert!(decode::<Info>(b"").is_err());
    }

    #[test]
    fn person_round_trip_is_identity() {
        let person = Person {
            name: "Good!".to_string(),
            age: "21".to_string(),
        };
        let decoded: Person = decode(&encode(&person)).unwrap();
        assert_eq!(decoded, person);
    }

    #[test]
    fn json_string_encodes_quoted() {
        // A JSON string body must keep its quotes on the wire.
        assert_eq!(encode(&Value::String("hi".into())), b"\"hi\"");
    }
}
