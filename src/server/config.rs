//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::RoomConfig;

/// Default path prefix; rooms are addressed as `/ws/{room_code}`
pub const DEFAULT_PATH_PREFIX: &str = "/ws/";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// Request path prefix preceding the room code
    pub path_prefix: String,

    /// Frames buffered per connection before broadcasts start waiting
    pub outbound_buffer: usize,

    /// Room capacity, send timeout and history settings
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            handshake_timeout: Duration::from_secs(10),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            outbound_buffer: 32,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the path prefix rooms are served under
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Set the per-connection outbound buffer
    pub fn outbound_buffer(mut self, frames: usize) -> Self {
        self.outbound_buffer = frames.max(1);
        self
    }

    /// Set the room configuration
    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.room = room;
        self
    }
}
