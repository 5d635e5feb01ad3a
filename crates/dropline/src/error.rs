//! Unified error type for the Dropline server.

use dropline_protocol::ProtocolError;
use dropline_session::SessionError;
use dropline_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Rule violations never reach this type: the handler turns them into
/// `error` events for the player. What does end up here ends one
/// connection, never the server.
#[derive(Debug, thiserror::Error)]
pub enum DroplineError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown join key, encode failure).
    #[error(transparent)]
    Session(#[from] SessionError),
}
