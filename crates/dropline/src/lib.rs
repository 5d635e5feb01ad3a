//! # Dropline
//!
//! Real-time two-player Connect Four over WebSockets.
//!
//! A browser opens a socket and sends `{"type":"init"}` to start a game; the
//! server answers with a join key. A second browser sends
//! `{"type":"init","join":"<key>"}` to take the other seat. From then on
//! each `{"column":n}` is checked by the rule engine and every accepted
//! move is broadcast to everyone in the game.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dropline::prelude::*;
//!
//! # async fn start() -> Result<(), DroplineError> {
//! let server = DroplineServer::builder()
//!     .bind("0.0.0.0:8010")
//!     .build::<ConnectFour>()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::DroplineError;
pub use handler::{INVALID_INIT, INVALID_MOVE, NOT_FOUND};
pub use server::{DEFAULT_BIND_ADDR, DroplineServer, DroplineServerBuilder};

/// Everything needed to stand up a server.
pub mod prelude {
    pub use crate::{DroplineError, DroplineServer, DroplineServerBuilder};
    pub use dropline_engine::{ConnectFour, EngineError, Outcome, RuleEngine};
    pub use dropline_protocol::{
        Codec, InitRequest, JoinKey, JsonCodec, MoveRequest, Player, ServerEvent,
    };
    pub use dropline_session::{SessionConfig, SessionError, SessionRegistry};
    pub use dropline_transport::{ConnectionId, TransportError};
}
