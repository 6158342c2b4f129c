//! Error types for the session layer.

use gridmatch_protocol::PlayerId;

/// Errors from the player directory and the notifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No player record exists for this id.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The player has no delivery channel registered. Whether this is an
    /// error depends on the caller: the disconnect cascade expects it.
    #[error("player {0} has no registered channel")]
    NotRegistered(PlayerId),

    /// The channel exists but its receiving end is gone.
    #[error("delivery to player {0} failed")]
    DeliveryFailed(PlayerId),
}
