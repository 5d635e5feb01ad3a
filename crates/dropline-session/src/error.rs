//! Error types for the session layer.

use dropline_engine::EngineError;
use dropline_protocol::{JoinKey, ProtocolError};

/// Errors that can occur while creating, joining, or playing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session is registered under this key. Either it never
    /// existed or its creator has left and the key was revoked.
    #[error("no session for join key {0}")]
    NotFound(JoinKey),

    /// The rule engine refused the move. Displays the engine's
    /// player-facing message unchanged.
    #[error(transparent)]
    Rejected(#[from] EngineError),

    /// An event could not be encoded for the wire.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    /// Returns `true` for rule violations, which are reported to the
    /// submitting player and otherwise ignored.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
