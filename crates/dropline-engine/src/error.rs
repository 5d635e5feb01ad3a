//! Error types for the rule engine.

/// A move the rules refuse.
///
/// The `Display` text is sent to the player verbatim inside an error
/// event, so it is written for humans, not logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The other player is due to move.
    #[error("It isn't your turn.")]
    NotYourTurn,

    /// The column index is outside the board.
    #[error("Invalid column.")]
    InvalidColumn(i64),

    /// The column has no free cell left.
    #[error("This slot is full.")]
    ColumnFull(usize),

    /// The game already has an outcome.
    #[error("The game is over.")]
    GameOver,
}
