//! The rule engine: pure functions over [`Match`] values.
//!
//! Nothing here touches a store or a lock. Every function takes a match by
//! reference and either answers a question about it or returns a new
//! value, which makes the rules trivially testable on hand-built matches.

use std::collections::HashSet;

use gridmatch_protocol::{Match, MatchStatus, PlayerId, Turn};

use crate::MatchConfig;

/// Why a turn was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The target cell already holds a claim by either player.
    #[error("cell ({x}, {y}) is already taken")]
    CellOccupied { x: i32, y: i32 },

    /// The acting player isn't seated in the match.
    #[error("player {0} is not seated in this match")]
    NotSeated(PlayerId),

    /// The target cell is off the board.
    #[error("cell ({x}, {y}) is outside the {size}x{size} board")]
    OutOfBounds { x: i32, y: i32, size: usize },
}

/// Result of evaluating the win lines of a match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WinCheck {
    pub has_win: bool,
    pub winner: Option<PlayerId>,
}

/// Stateless rules for an N×N grid game (N = 3 by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEngine {
    board_size: usize,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(&MatchConfig::default())
    }
}

impl RuleEngine {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            board_size: config.board_size.max(1),
        }
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// Returns `true` if the match can take another player: still `Open`
    /// and fewer than two seated.
    pub fn is_open(game: &Match) -> bool {
        game.status == MatchStatus::Open && game.players.len() < 2
    }

    /// Checks that (`x`, `y`) lies on the board.
    pub fn validate_cell(&self, x: i32, y: i32) -> Result<(), RuleError> {
        let in_range = |v: i32| usize::try_from(v).is_ok_and(|v| v < self.board_size);
        if in_range(x) && in_range(y) {
            Ok(())
        } else {
            Err(RuleError::OutOfBounds {
                x,
                y,
                size: self.board_size,
            })
        }
    }

    /// Returns a copy of `game` with `turn` appended.
    ///
    /// Only legality is checked here: the player must be seated and the
    /// cell must be on the board and free. Phase (enough players, not
    /// finished) and win detection are the caller's business.
    pub fn apply_turn(&self, game: &Match, turn: Turn) -> Result<Match, RuleError> {
        if !game.has_player(&turn.player) {
            return Err(RuleError::NotSeated(turn.player));
        }
        self.validate_cell(turn.x, turn.y)?;
        if game.moves.iter().any(|m| m.x == turn.x && m.y == turn.y) {
            return Err(RuleError::CellOccupied {
                x: turn.x,
                y: turn.y,
            });
        }

        let mut next = game.clone();
        next.moves.push(turn);
        Ok(next)
    }

    /// Looks for a completed row, column, or diagonal.
    ///
    /// `first` is checked before `second`. Under one-cell-per-turn play
    /// both can't complete a line at once, so the order never matters in
    /// practice. A full board without a line reports no win; draws are
    /// not detected.
    pub fn check_win_condition(
        &self,
        game: &Match,
        first: &PlayerId,
        second: &PlayerId,
    ) -> WinCheck {
        for player in [first, second] {
            let cells: HashSet<(i32, i32)> = game
                .moves
                .iter()
                .filter(|m| &m.player == player)
                .map(|m| (m.x, m.y))
                .collect();

            if self.lines().any(|line| line.iter().all(|c| cells.contains(c))) {
                return WinCheck {
                    has_win: true,
                    winner: Some(player.clone()),
                };
            }
        }
        WinCheck::default()
    }

    /// Every winning line as a list of (x, y) cells.
    fn lines(&self) -> impl Iterator<Item = Vec<(i32, i32)>> {
        let n = self.board_size as i32;
        let rows = (0..n).map(move |y| (0..n).map(|x| (x, y)).collect::<Vec<_>>());
        let cols = (0..n).map(move |x| (0..n).map(|y| (x, y)).collect::<Vec<_>>());
        let diagonal = std::iter::once((0..n).map(|i| (i, i)).collect::<Vec<_>>());
        let anti = std::iter::once((0..n).map(|i| (n - 1 - i, i)).collect::<Vec<_>>());
        rows.chain(cols).chain(diagonal).chain(anti)
    }
}
