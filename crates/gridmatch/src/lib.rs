//! # Gridmatch
//!
//! A match server for a two-player grid game (tic-tac-toe by default).
//!
//! Players connect over WebSocket at `/ws/<name>`, open or join matches,
//! claim cells, and receive push notifications whenever their match or
//! the list of open matches changes. All state lives in memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridmatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GridmatchError> {
//!     gridmatch::init_tracing("info");
//!     let server = GridmatchServer::builder()
//!         .bind("0.0.0.0:8000")
//!         .build()
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::GridmatchError;
pub use server::{DEFAULT_BIND_ADDR, GridmatchServer, GridmatchServerBuilder};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that writes to stderr.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `default_directive` (e.g. `"info"` or `"gridmatch=debug"`). Calling it
/// more than once is harmless; later calls are ignored.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything needed to run a server or write a client test.
pub mod prelude {
    pub use crate::{GridmatchError, GridmatchServer, GridmatchServerBuilder};
    pub use gridmatch_game::{
        InMemoryCoordinator, MatchConfig, MatchCoordinator, MatchError, MatchStore, RuleEngine,
    };
    pub use gridmatch_protocol::{
        Codec, Envelope, ErrorKind, EventType, FieldError, JsonCodec, Match, MatchId, MatchStatus,
        Notification, Payload, Player, PlayerId, Reply, Request, Turn,
    };
    pub use gridmatch_session::{Notifier, PlayerDirectory};
}
