//! Room registry implementation
//!
//! The central registry that maps room codes to live rooms. It is the only
//! place rooms are created or removed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::RoomConfig;
use super::error::{JoinRejection, RejectReason};
use super::frame::{RelayFrame, RoomCode};
use super::room::{Admission, Delivery, Room, RoomStats};
use crate::session::{ConnectionId, PeerHandle};

/// Central registry for all live rooms
///
/// The map is guarded by an `RwLock` for structural changes; each room
/// guards its own membership, so traffic never takes the map's write lock.
pub struct RoomRegistry {
    /// Map of room code to room
    rooms: RwLock<HashMap<RoomCode, Arc<Room>>>,

    /// Configuration applied to every room
    config: RoomConfig,

    /// Set by `close_all`; only changed while holding the map's write lock
    closed: AtomicBool,
}

impl RoomRegistry {
    /// Create a registry with default room configuration
    pub fn new() -> Self {
        Self::with_config(RoomConfig::default())
    }

    /// Create a registry with custom room configuration
    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Get the room configuration
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Whether `close_all` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Return the room for `code`, creating an empty one if needed
    ///
    /// Once the registry is closed, new rooms are handed out already
    /// retired and are never inserted.
    pub async fn get_or_create_room(&self, code: &RoomCode) -> Arc<Room> {
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(code) {
                return Arc::clone(room);
            }
        }

        let mut rooms = self.rooms.write().await;

        if self.is_closed() {
            let room = Room::new(code.clone(), self.config.clone());
            room.retire().await;
            return Arc::new(room);
        }

        match rooms.entry(code.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let room = Arc::new(Room::new(code.clone(), self.config.clone()));
                tracing::info!(room = %code, capacity = room.capacity(), "Room created");
                Arc::clone(entry.insert(room))
            }
        }
    }

    /// Remove the room for `code` if it has no members
    ///
    /// Emptiness is checked while holding the map's write lock, so a join
    /// cannot slip in between the check and the removal. Returns `true` if
    /// a room was removed.
    pub async fn remove_room_if_empty(&self, code: &RoomCode) -> bool {
        let mut rooms = self.rooms.write().await;

        let Some(room) = rooms.get(code) else {
            return false;
        };

        if !room.retire_if_empty().await {
            return false;
        }

        rooms.remove(code);
        tracing::info!(room = %code, "Room removed");
        true
    }

    /// Join the room for `code`, creating it if needed
    ///
    /// Retries against a fresh room if the one found was removed before the
    /// join landed, so the only rejections returned are `RoomFull`,
    /// `AlreadyJoined`, and `ServerClosed` once the registry is closed.
    pub async fn join(
        &self,
        code: &RoomCode,
        peer: PeerHandle,
    ) -> Result<(Arc<Room>, Admission), JoinRejection> {
        let mut peer = peer;

        loop {
            let room = self.get_or_create_room(code).await;

            match room.try_join(peer).await {
                Ok(admission) => return Ok((room, admission)),
                Err(rejection) if rejection.reason == RejectReason::RoomClosed => {
                    if self.is_closed() {
                        return Err(JoinRejection {
                            reason: RejectReason::ServerClosed,
                            ..rejection
                        });
                    }
                    peer = rejection.into_peer();
                }
                Err(rejection) => {
                    // A rejected join must not leave a lazily created room behind
                    self.remove_room_if_empty(code).await;
                    return Err(rejection);
                }
            }
        }
    }

    /// Remove `id` from `room`, then drop the room if it is now empty
    ///
    /// Returns whether `id` was a member. Safe to call more than once.
    pub async fn leave(&self, room: &Room, id: ConnectionId) -> bool {
        let removed = room.leave(id).await;
        self.remove_room_if_empty(room.code()).await;
        removed
    }

    /// Broadcast within `room`, dropping the room if evictions emptied it
    pub async fn broadcast(
        &self,
        room: &Room,
        sender: ConnectionId,
        frame: RelayFrame,
    ) -> Delivery {
        let delivery = room.broadcast(sender, frame).await;

        if !delivery.evicted.is_empty() {
            self.remove_room_if_empty(room.code()).await;
        }

        delivery
    }

    /// Look up a room without creating it
    pub async fn room(&self, code: &RoomCode) -> Option<Arc<Room>> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Codes of all live rooms, sorted
    pub async fn room_codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.rooms.read().await.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Recent frames for a room, or `None` if the room does not exist
    pub async fn history(&self, code: &RoomCode) -> Option<Vec<RelayFrame>> {
        let room = self.room(code).await?;
        Some(room.history().await)
    }

    /// Statistics for a room
    pub async fn room_stats(&self, code: &RoomCode) -> Option<RoomStats> {
        let room = self.room(code).await?;
        Some(room.stats().await)
    }

    /// Remove every room, drop all member handles, and refuse later joins
    ///
    /// Writer tasks see their channel close and shut their sockets.
    /// Returns the number of rooms closed.
    pub async fn close_all(&self) -> usize {
        let mut rooms = self.rooms.write().await;
        self.closed.store(true, Ordering::Release);
        let count = rooms.len();

        for (code, room) in rooms.drain() {
            let members = room.retire().await;
            tracing::info!(room = %code, members = members, "Room closed");
        }

        count
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
