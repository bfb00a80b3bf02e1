//! Room-scoped real-time message relay
//!
//! Clients connect over WebSocket to `ws://host/ws/{room_code}`. Each message
//! a client sends is relayed to every other member of the same room.
//!
//! ```text
//!   client A ──ws──► RelayServer ──► RoomRegistry ──► Room "abc"
//!                        │                              │
//!                  receive loop ── broadcast ───────────┤
//!                                                       ▼
//!                                          PeerHandle(B) ──► writer task ──► client B
//! ```
//!
//! Rooms are created lazily on first join and dropped when their last
//! member leaves. Room capacity defaults to 2 (one-to-one chat).
//!
//! # Example
//!
//! ```no_run
//! use room_relay::{RelayServer, RoomConfig, ServerConfig};
//!
//! # async fn run() -> room_relay::Result<()> {
//! let config = ServerConfig::default()
//!     .bind("127.0.0.1:8000".parse().unwrap())
//!     .room_config(RoomConfig::default().capacity(4));
//!
//! RelayServer::new(config).run().await
//! # }
//! ```

pub mod error;
pub mod registry;
pub mod server;
pub mod session;

pub use error::{Error, Result};
pub use registry::{
    Admission, Delivery, JoinRejection, RejectReason, RelayFrame, Room, RoomCode, RoomConfig,
    RoomRegistry, RoomStats,
};
pub use server::{RelayServer, ServerConfig, ROOM_FULL_NOTICE};
pub use session::{ConnectionId, ConnectionState, DeliveryError, MembershipPhase, PeerHandle};
