//! Codec trait and implementations for serializing/deserializing records.
//!
//! The session layer doesn't care HOW records are serialized. It holds
//! something that implements [`Codec`] and asks it for bytes. Browsers only
//! speak JSON today, so [`JsonCodec`] is the one implementation.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task and every session for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use dropline_protocol::{Codec, JsonCodec, MoveRequest, Player, ServerEvent};
///
/// let codec = JsonCodec;
///
/// let request: MoveRequest = codec.decode(br#"{"column": 3}"#).unwrap();
/// assert_eq!(request.column, 3);
///
/// let event = ServerEvent::Play { player: Player::One, column: 3, row: 0 };
/// let bytes = codec.encode(&event).unwrap();
/// assert_eq!(bytes, br#"{"type":"play","player":1,"column":3,"row":0}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
