//! Per-connection session state
//!
//! A connection is owned by its task in [`crate::server::connection`]. Rooms
//! only hold a [`PeerHandle`], which can send to the connection but not
//! read from it.

pub mod context;
pub mod peer;
pub mod state;

pub use context::ConnectionContext;
pub use peer::{ConnectionId, DeliveryError, PeerHandle};
pub use state::{ConnectionState, MembershipPhase};
