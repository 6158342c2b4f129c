//! Connected-player bookkeeping for Gridmatch.
//!
//! Two pieces live here, both keyed by [`PlayerId`](gridmatch_protocol::PlayerId):
//!
//! 1. **Directory**: who is known to the server ([`PlayerDirectory`]).
//! 2. **Notifier**: how to reach them ([`Notifier`]), a map from player to
//!    an outbound channel that the connection handler drains.
//!
//! # How it fits in the stack
//!
//! ```text
//! Game Layer (above)     ← coordinator reads the directory, pushes via the notifier
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below) ← provides PlayerId, Player, Notification
//! ```
//!
//! Both traits take `&self` and lock internally, one mutex per map. Reads
//! hand out clones so callers never hold a lock across their own logic.

mod directory;
mod error;
mod notifier;

pub use directory::{InMemoryPlayerDirectory, PlayerDirectory};
pub use error::SessionError;
pub use notifier::{ChannelNotifier, Notifier, PlayerSender};
