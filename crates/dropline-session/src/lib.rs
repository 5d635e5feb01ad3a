//! Game sessions for Dropline.
//!
//! This crate owns everything between "a socket said something" and "the
//! rule engine decided":
//!
//! 1. **Join keys**: the [`SessionRegistry`] issues an unguessable key
//!    per game and resolves it for the second player.
//! 2. **Sessions**: a [`Session`] owns one rule engine and the set of
//!    connections watching it, and serializes moves.
//! 3. **Broadcast**: every accepted move is encoded once and fanned out to
//!    each [`Subscriber`]'s outbound queue; a writer task per connection
//!    drains that queue into the socket ([`spawn_writer`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / connection handler (above)  ← one task per socket
//!     ↕
//! Session layer (this crate)  ← registry, sessions, fan-out
//!     ↕
//! Engine + protocol (below)  ← rules, wire records
//! ```
//!
//! # Locking
//!
//! Each structure owns its lock. The registry map and each session's
//! subscriber list sit behind `RwLock`s; each session's engine sits behind
//! a `Mutex` so at most one move is applied at a time. Nothing ever locks
//! across sessions.

mod broadcast;
mod config;
mod error;
mod registry;
mod session;

pub use broadcast::{
    Delivery, Frame, Subscriber, encode_frame, fan_out, outbound_channel, spawn_writer, unicast,
};
pub use config::SessionConfig;
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::Session;
