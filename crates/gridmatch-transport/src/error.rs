use std::io;

/// What can go wrong below the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The TCP accept itself failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A client connected but the WebSocket upgrade didn't complete.
    #[error("WebSocket upgrade failed: {0}")]
    Upgrade(String),

    /// The connection is already closed; nothing more can be sent.
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}
