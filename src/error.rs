//! Server-level error types

use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Errors surfaced by the relay server
///
/// Per-connection failures are contained to their connection and only show
/// up here when returned from [`crate::server::connection`] for logging.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or listener I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Client did not complete the WebSocket handshake in time
    #[error("handshake not completed within {0:?}")]
    HandshakeTimeout(Duration),

    /// Request path did not name a room
    #[error("invalid room path: {0}")]
    InvalidPath(String),
}

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;
