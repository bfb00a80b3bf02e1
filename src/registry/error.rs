//! Registry error types
//!
//! Join rejections for room admission.

use super::frame::RoomCode;
use crate::session::PeerHandle;

/// Why a connection was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Room already holds `capacity` members
    #[error("room is full")]
    RoomFull,
    /// Room was removed from the registry before the join landed
    #[error("room is closed")]
    RoomClosed,
    /// The connection is already a member
    #[error("connection already joined")]
    AlreadyJoined,
    /// The registry was closed for shutdown
    #[error("server is shutting down")]
    ServerClosed,
}

/// A rejected join
///
/// Membership is untouched; the peer handle is returned to the caller so it
/// can notify the client or retry elsewhere.
#[derive(Debug, thiserror::Error)]
#[error("join to room {room} rejected: {reason}")]
pub struct JoinRejection {
    /// Room that rejected the join
    pub room: RoomCode,
    /// Rejection reason
    pub reason: RejectReason,
    /// The peer that was not admitted
    pub peer: PeerHandle,
}

impl JoinRejection {
    /// Take back the rejected peer handle
    pub fn into_peer(self) -> PeerHandle {
        self.peer
    }
}
