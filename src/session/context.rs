//! Connection context
//!
//! Identifying information about a connection, carried through the
//! connection task for logging and membership calls.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::peer::ConnectionId;
use crate::registry::RoomCode;

/// Read-only information about an accepted connection
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Unique connection ID
    pub conn_id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Room requested in the handshake path (set once the handshake completes)
    pub room: Option<RoomCode>,

    /// When the TCP connection was accepted
    pub connected_at: Instant,
}

impl ConnectionContext {
    /// Create a context for a freshly accepted socket
    pub fn new(conn_id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            conn_id,
            peer_addr,
            room: None,
            connected_at: Instant::now(),
        }
    }

    /// Time since the socket was accepted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
