//! Connect Four: 7 columns, 6 rows, discs fall to the lowest free cell.

use dropline_protocol::Player;

use crate::{EngineError, Outcome, RuleEngine};

/// Number of columns on the board.
pub const COLUMNS: usize = 7;
/// Number of rows on the board. Row 0 is the bottom.
pub const ROWS: usize = 6;

/// Length of a winning line.
const CONNECT: usize = 4;

/// Directions checked from the last disc: horizontal, vertical, and the
/// two diagonals. The opposite direction is walked by negating.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// A Connect Four game.
///
/// [`Player::One`] always moves first and turns alternate. Each call to
/// [`apply_move`](RuleEngine::apply_move) only inspects lines through the
/// disc it just placed, so a win is detected the moment it happens.
#[derive(Debug, Clone)]
pub struct ConnectFour {
    /// `cells[column][row]`, column-major so a drop only touches one array.
    cells: [[Option<Player>; ROWS]; COLUMNS],
    /// Next free row in each column.
    heights: [usize; COLUMNS],
    moves: usize,
    next: Player,
    outcome: Option<Outcome>,
}

impl ConnectFour {
    /// Creates an empty board with Player One to move.
    pub fn new() -> Self {
        Self {
            cells: [[None; ROWS]; COLUMNS],
            heights: [0; COLUMNS],
            moves: 0,
            next: Player::One,
            outcome: None,
        }
    }

    /// Returns the player due to move next.
    pub fn next_player(&self) -> Player {
        self.next
    }

    /// Returns the disc at `(column, row)`, if any.
    pub fn cell(&self, column: usize, row: usize) -> Option<Player> {
        self.cells.get(column)?.get(row).copied().flatten()
    }

    /// Returns how many moves have been accepted.
    pub fn move_count(&self) -> usize {
        self.moves
    }

    /// Counts consecutive `player` discs from `(column, row)` stepping by
    /// `(dc, dr)`, excluding the starting cell.
    fn run_length(&self, player: Player, column: usize, row: usize, dc: isize, dr: isize) -> usize {
        let mut count = 0;
        let (mut c, mut r) = (column as isize + dc, row as isize + dr);
        while c >= 0 && r >= 0 && self.cell(c as usize, r as usize) == Some(player) {
            count += 1;
            c += dc;
            r += dr;
        }
        count
    }

    fn completes_line(&self, player: Player, column: usize, row: usize) -> bool {
        DIRECTIONS.iter().any(|&(dc, dr)| {
            1 + self.run_length(player, column, row, dc, dr)
                + self.run_length(player, column, row, -dc, -dr)
                >= CONNECT
        })
    }
}

impl Default for ConnectFour {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine for ConnectFour {
    fn apply_move(&mut self, player: Player, column: i64) -> Result<usize, EngineError> {
        if self.outcome.is_some() {
            return Err(EngineError::GameOver);
        }
        if player != self.next {
            return Err(EngineError::NotYourTurn);
        }
        let col = usize::try_from(column)
            .ok()
            .filter(|c| *c < COLUMNS)
            .ok_or(EngineError::InvalidColumn(column))?;
        let row = self.heights[col];
        if row == ROWS {
            return Err(EngineError::ColumnFull(col));
        }

        self.cells[col][row] = Some(player);
        self.heights[col] += 1;
        self.moves += 1;
        self.next = player.other();

        if self.completes_line(player, col, row) {
            self.outcome = Some(Outcome::Winner(player));
        } else if self.moves == COLUMNS * ROWS {
            self.outcome = Some(Outcome::Draw);
        }

        Ok(row)
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }
}
