//! Match configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every match the coordinator runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Side length of the square board. A full row, column, or diagonal
    /// of this length wins. Values below 1 are treated as 1.
    pub board_size: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { board_size: 3 }
    }
}
