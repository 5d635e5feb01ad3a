//! Wire protocol for Dropline.
//!
//! This crate defines the "language" that browsers and the session server
//! speak:
//!
//! - **Identity** ([`Player`], [`JoinKey`]): who is moving, and the secret
//!   that admits the second player to a game.
//! - **Records** ([`InitRequest`], [`MoveRequest`], [`ServerEvent`]): the
//!   JSON objects that travel over the socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those records are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (records) → Session (game + subscribers)
//! ```
//!
//! There is no envelope: every frame is one bare JSON object, and the
//! server-to-client records carry their kind in a `"type"` field.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{InitRequest, JoinKey, MoveRequest, Player, ServerEvent};
