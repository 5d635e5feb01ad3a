//! Rule engines for Dropline.
//!
//! The session layer never looks at a board. It hands a move to a
//! [`RuleEngine`] and gets back either the row the disc landed in or an
//! [`EngineError`] explaining why the move was refused, then asks for the
//! [`Outcome`].
//!
//! # Key types
//!
//! - [`RuleEngine`]: the trait a game implements
//! - [`ConnectFour`]: the classic 7×6 board
//! - [`Outcome`]: who won, or a draw
//! - [`EngineError`]: rule violations, with player-facing messages

mod connect_four;
mod error;
mod logic;

pub use connect_four::{COLUMNS, ConnectFour, ROWS};
pub use error::EngineError;
pub use logic::{Outcome, RuleEngine};
