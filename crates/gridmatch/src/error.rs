//! Unified error type for the Gridmatch server.

use gridmatch_game::MatchError;
use gridmatch_protocol::ProtocolError;
use gridmatch_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// Player-visible failures travel to the client as error replies and
/// only end up here when the server itself has to give up on a
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum GridmatchError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A coordinator operation failed.
    #[error(transparent)]
    Match(#[from] MatchError),
}
