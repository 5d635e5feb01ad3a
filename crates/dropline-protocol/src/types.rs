//! Core protocol types for Dropline's wire format.
//!
//! Every type here travels "on the wire": it is serialized to JSON, sent
//! over the socket, and parsed by the browser (or the other way round).
//! The JSON shapes are fixed by the web client, so the tests at the bottom
//! pin them exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// One of the two seats at the board.
///
/// On the wire a player is the bare number `1` or `2`. The
/// `into`/`try_from` attributes route serde through `u8`, so a client that
/// sends `3` gets a decode error instead of a silently invented seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    /// The player who created the session. Moves first.
    One,
    /// Everyone admitted through the join key.
    Two,
}

impl Player {
    /// Returns the opponent's seat.
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Returns the wire number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> Self {
        player.number()
    }
}

impl TryFrom<u8> for Player {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ProtocolError::InvalidMessage(format!(
                "player must be 1 or 2, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// The secret that admits a second participant to a session.
///
/// Issued by the server when a game is created and embedded by the
/// browser in a shareable link. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinKey(String);

impl JoinKey {
    /// Wraps a raw key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// The first message on every connection: start a game or join one.
///
/// `#[serde(tag = "type")]` makes the only accepted shape
/// `{"type": "init", ...}`; any other tag is a decode error, which the
/// handler treats as a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InitRequest {
    /// `join` absent (or null) means "create a new session".
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<JoinKey>,
    },
}

impl InitRequest {
    /// Returns the join key, if this is a join request.
    pub fn into_join_key(self) -> Option<JoinKey> {
        match self {
            Self::Init { join } => join,
        }
    }
}

/// A move: drop a disc into `column`.
///
/// The column is signed so that out-of-range values (including negative
/// ones) reach the rule engine and come back as a rule violation rather
/// than a generic decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub column: i64,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server sends.
///
/// `Init` and `Error` are unicast to one connection; `Play`, `Win`, and
/// `Draw` are broadcast to every connection attached to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// The session was created; `join` is the key for the invite link.
    Init { join: JoinKey },

    /// A move was accepted. `row` 0 is the bottom of the board.
    Play {
        player: Player,
        column: i64,
        row: usize,
    },

    /// The game ended with `player` connecting four.
    Win { player: Player },

    /// The board filled up without a winner.
    Draw,

    /// Something the sender did was rejected.
    Error { message: String },
}

impl ServerEvent {
    /// Builds an [`ServerEvent::Error`] from any displayable message.
    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// Returns `true` for the events that end a game.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Win { .. } | Self::Draw)
    }
}

// =========================================================================
// Tests
// =========================================================================
