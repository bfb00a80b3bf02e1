//! Room registry for room-scoped fan-out
//!
//! The registry owns the mapping from room code to [`Room`]. Each room owns
//! its membership and fans messages out to every member except the sender.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<RoomRegistry>
//!                 ┌────────────────────────────┐
//!                 │ rooms: RwLock<HashMap<     │
//!                 │   RoomCode, Arc<Room {     │
//!                 │     inner: Mutex<members,  │
//!                 │                  history>  │
//!                 │   }>                       │
//!                 │ >>                         │
//!                 └─────────────┬──────────────┘
//!                               │
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!     [Connection A]       [Connection B]       [Connection C]
//!     recv loop            PeerHandle           PeerHandle
//!          │                    ▲                    ▲
//!          └── room.broadcast() ┴────────────────────┘
//! ```
//!
//! # Locking
//!
//! The map lock covers structural changes only (room creation and
//! removal). Membership and history sit behind one mutex per room, so
//! traffic in one room never waits on another. Locks are always taken in
//! the order registry → room.
//!
//! # Zero-Copy Fan-out
//!
//! [`RelayFrame`] payloads are reference counted, so every peer shares the
//! sender's allocation.

pub mod config;
pub mod error;
pub mod frame;
pub mod room;
pub mod store;

pub use config::RoomConfig;
pub use error::{JoinRejection, RejectReason};
pub use frame::{RelayFrame, RoomCode};
pub use room::{Admission, Delivery, Room, RoomStats};
pub use store::RoomRegistry;
