//! `GridmatchServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport, JSON codec, and one
//! shared [`InMemoryCoordinator`] that every connection task calls into.

use std::net::SocketAddr;
use std::sync::Arc;

use gridmatch_game::{InMemoryCoordinator, MatchConfig};
use gridmatch_protocol::{Codec, JsonCodec};
use gridmatch_transport::{Transport, WebSocketTransport};

use crate::GridmatchError;
use crate::handler::handle_connection;

/// Address used when the builder isn't given one.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// State shared by every connection task.
///
/// The coordinator does its own locking, so no outer mutex is needed.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: InMemoryCoordinator,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Gridmatch server.
///
/// # Example
///
/// ```rust,no_run
/// use gridmatch::prelude::*;
///
/// # async fn start() -> Result<(), GridmatchError> {
/// let server = GridmatchServer::builder()
///     .bind("0.0.0.0:8000")
///     .match_config(MatchConfig { board_size: 3 })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GridmatchServerBuilder {
    bind_addr: String,
    match_config: MatchConfig,
}

impl GridmatchServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            match_config: MatchConfig::default(),
        }
    }

    /// Sets the address to listen on. Port 0 picks a free port; read it
    /// back with [`GridmatchServer::local_addr`].
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    /// Binds the listener and builds the server with the JSON codec.
    pub async fn build(self) -> Result<GridmatchServer<JsonCodec>, GridmatchError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            coordinator: InMemoryCoordinator::in_memory(&self.match_config),
            codec: JsonCodec,
        });

        Ok(GridmatchServer { transport, state })
    }
}

impl Default for GridmatchServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gridmatch server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GridmatchServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GridmatchServer<JsonCodec> {
    pub fn builder() -> GridmatchServerBuilder {
        GridmatchServerBuilder::new()
    }
}

impl<C: Codec> GridmatchServer<C> {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator behind this server, for inspection.
    pub fn coordinator(&self) -> &InMemoryCoordinator {
        &self.state.coordinator
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own task. A failed accept (for
    /// example a client that never finishes the upgrade) is logged and
    /// the loop keeps going.
    pub async fn run(mut self) -> Result<(), GridmatchError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Gridmatch server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
