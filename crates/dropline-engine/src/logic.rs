//! The `RuleEngine` trait: the seam between sessions and game rules.

use dropline_protocol::Player;

use crate::EngineError;

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `Player` completed a winning line.
    Winner(Player),
    /// No legal moves remain and nobody won.
    Draw,
}

impl Outcome {
    /// Returns the winner, or `None` for a draw.
    pub fn winner(self) -> Option<Player> {
        match self {
            Self::Winner(player) => Some(player),
            Self::Draw => None,
        }
    }
}

/// One game's board and turn state.
///
/// A session owns exactly one engine and calls it from behind a mutex, so
/// implementations are plain `&mut self` state machines with no locking
/// of their own. `Send + 'static` lets the session move between Tokio
/// worker threads.
pub trait RuleEngine: Send + 'static {
    /// Applies `player`'s move in `column` and returns the row it landed on.
    ///
    /// Turn order, bounds, and "game already over" are all checked here;
    /// a rejected move leaves the engine unchanged.
    fn apply_move(&mut self, player: Player, column: i64) -> Result<usize, EngineError>;

    /// Returns the outcome once the game has ended.
    fn outcome(&self) -> Option<Outcome>;

    /// Returns `true` once [`outcome`](Self::outcome) is decided.
    fn is_concluded(&self) -> bool {
        self.outcome().is_some()
    }
}
