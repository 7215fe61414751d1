//! Payload encoding for request and response bodies.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{RemoteError, Result};

/// Encodes request payloads and decodes response payloads.
///
/// Codecs work on [`Value`] records; typed messages are converted with
/// [`encode_message`] and [`decode_message`].
pub trait EntryCodec: Debug + Send + Sync {
    /// MIME type of encoded payloads.
    fn content_type(&self) -> &'static str;

    /// Encodes a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded.
    fn encode(&self, record: &Value) -> Result<Vec<u8>>;

    /// Decodes a record.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid payload.
    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EntryCodec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, record: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Encodes a typed message with `codec`.
///
/// # Errors
///
/// Returns an error if the message cannot be represented or encoded.
pub fn encode_message<T: Serialize>(codec: &dyn EntryCodec, message: &T) -> Result<Vec<u8>> {
    codec.encode(&serde_json::to_value(message)?)
}

/// Decodes a typed message with `codec`.
///
/// # Errors
///
/// Returns [`RemoteError::InvalidResponse`] if the payload decodes but does
/// not match `T`.
pub fn decode_message<T: DeserializeOwned>(codec: &dyn EntryCodec, bytes: &[u8]) -> Result<T> {
    let record = codec.decode(bytes)?;
    serde_json::from_value(record).map_err(|e| RemoteError::InvalidResponse {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct ScopeReply {
        source_id: String,
    }

    #[test]
    fn test_decode_message() {
        let reply: ScopeReply = decode_message(&JsonCodec, br#"{"source_id": "abc"}"#).unwrap();
        assert_eq!(reply.source_id, "abc");
    }

    #[test]
    fn test_decode_wrong_shape() {
        let err = decode_message::<ScopeReply>(&JsonCodec, br#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidResponse { .. }));
    }

    #[test]
    fn test_decode_garbage() {
        let err = JsonCodec.decode(b"\x93not json").unwrap_err();
        assert!(matches!(err, RemoteError::Codec { .. }));
    }

    #[test]
    fn test_encode_message() {
        let bytes = encode_message(&JsonCodec, &json!({"action": "search"})).unwrap();
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), json!({"action": "search"}));
    }
}
