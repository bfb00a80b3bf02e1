//! Relay server
//!
//! Accepts TCP connections, upgrades them to WebSocket, and binds each one
//! to the room named in its request path.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::{Connection, ROOM_FULL_NOTICE};
pub use listener::RelayServer;
