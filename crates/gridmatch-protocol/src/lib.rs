//! Wire protocol and shared data records for Gridmatch.
//!
//! This crate defines everything that both sides of a connection agree on:
//!
//! - **Records** ([`Player`], [`Match`], [`Turn`]): the state the server
//!   keeps and hands back to clients as value copies.
//! - **Messages** ([`Envelope`], [`Request`], [`Reply`], [`Notification`]):
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`], [`ErrorKind`]): what can go wrong while
//!   encoding, and the closed set of failure kinds reported to clients.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Game (coordinator)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ErrorKind, FieldError, ProtocolError};
pub use types::{
    Envelope, EventType, Match, MatchId, MatchStatus, Notification, Payload,
    Player, PlayerId, Reply, Request, Turn,
};
