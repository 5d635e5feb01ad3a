//! Error types for the protocol layer.
//!
//! Each crate in Dropline defines its own error enum. A `ProtocolError`
//! always means the bytes were fine at the transport level but could not be
//! turned into (or produced from) one of our records.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, the wrong
    /// `"type"` tag, or a value of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A value that decoded fine but violates protocol rules, such as a
    /// player number other than 1 or 2.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
