//! Room session
//!
//! Admission policy and fan-out for a single room. All membership changes
//! and the membership reads made by [`Room::broadcast`] go through one mutex
//! per room.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::Mutex;

use super::config::RoomConfig;
use super::error::{JoinRejection, RejectReason};
use super::frame::{RelayFrame, RoomCode};
use crate::session::{ConnectionId, DeliveryError, PeerHandle};

/// Outcome of a successful join
#[derive(Debug, Default)]
pub struct Admission {
    /// Members in the room after the join
    pub members: usize,
    /// History to deliver before live traffic (empty unless replay is enabled)
    pub catchup: Vec<RelayFrame>,
}

/// Outcome of a broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Peers that accepted the frame
    pub delivered: usize,
    /// Peers that failed or timed out and were removed from the room
    pub evicted: Vec<ConnectionId>,
}

/// Point-in-time view of a room
#[derive(Debug, Clone)]
pub struct RoomStats {
    /// Current member count
    pub members: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Frames held in history
    pub history_len: usize,
    /// Time since the room was created
    pub age: Duration,
}

struct RoomInner {
    /// Members in join order
    members: Vec<PeerHandle>,

    /// Most recent frames, oldest first
    history: VecDeque<RelayFrame>,

    /// Set once the room has been removed from its registry
    retired: bool,
}

impl RoomInner {
    fn position(&self, id: ConnectionId) -> Option<usize> {
        self.members.iter().position(|peer| peer.id() == id)
    }

    fn record(&mut self, frame: &RelayFrame, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.history.len() >= limit {
            self.history.pop_front();
        }
        self.history.push_back(frame.clone());
    }
}

/// A named group of at most `capacity` connections
pub struct Room {
    code: RoomCode,
    config: RoomConfig,
    inner: Mutex<RoomInner>,
    created_at: Instant,
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("capacity", &self.capacity())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Room {
    /// Create an empty room
    pub fn new(code: RoomCode, config: RoomConfig) -> Self {
        Self {
            code,
            config,
            inner: Mutex::new(RoomInner {
                members: Vec::new(),
                history: VecDeque::new(),
                retired: false,
            }),
            created_at: Instant::now(),
        }
    }

    /// Code this room is registered under
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Maximum number of members
    pub fn capacity(&self) -> usize {
        self.config.capacity.max(1)
    }

    /// Admit `peer` if the room has space
    ///
    /// A rejected join leaves membership untouched and returns the handle
    /// inside the [`JoinRejection`].
    pub async fn try_join(&self, peer: PeerHandle) -> Result<Admission, JoinRejection> {
        let mut inner = self.inner.lock().await;

        let reason = if inner.retired {
            Some(RejectReason::RoomClosed)
        } else if inner.position(peer.id()).is_some() {
            Some(RejectReason::AlreadyJoined)
        } else if inner.members.len() >= self.capacity() {
            Some(RejectReason::RoomFull)
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::debug!(
                room = %self.code,
                conn_id = %peer.id(),
                members = inner.members.len(),
                reason = %reason,
                "Join rejected"
            );
            return Err(JoinRejection {
                room: self.code.clone(),
                reason,
                peer,
            });
        }

        let conn_id = peer.id();
        inner.members.push(peer);

        let catchup = if self.config.replay_history {
            inner.history.iter().cloned().collect()
        } else {
            Vec::new()
        };

        tracing::debug!(
            room = %self.code,
            conn_id = %conn_id,
            members = inner.members.len(),
            catchup_frames = catchup.len(),
            "Member joined"
        );

        Ok(Admission {
            members: inner.members.len(),
            catchup,
        })
    }

    /// Remove a member
    ///
    /// Idempotent: returns `false` if `id` was not a member.
    pub async fn leave(&self, id: ConnectionId) -> bool {
        let mut inner = self.inner.lock().await;

        match inner.position(id) {
            Some(index) => {
                inner.members.remove(index);
                tracing::debug!(
                    room = %self.code,
                    conn_id = %id,
                    members = inner.members.len(),
                    "Member left"
                );
                true
            }
            None => false,
        }
    }

    /// Deliver `frame` to every member except `sender`
    ///
    /// Membership is snapshotted under the lock and the sends run without
    /// it. Each peer gets at most `send_timeout`; peers that fail are
    /// removed once the fan-out completes. Nothing is delivered if `sender`
    /// is no longer a member.
    pub async fn broadcast(&self, sender: ConnectionId, frame: RelayFrame) -> Delivery {
        let peers: Vec<PeerHandle> = {
            let mut inner = self.inner.lock().await;

            if inner.position(sender).is_none() {
                tracing::trace!(room = %self.code, conn_id = %sender, "Broadcast from non-member dropped");
                return Delivery::default();
            }

            inner.record(&frame, self.config.history_limit);

            inner
                .members
                .iter()
                .filter(|peer| peer.id() != sender)
                .cloned()
                .collect()
        };

        // Writers that are already gone get no send attempt
        let (closed, open): (Vec<PeerHandle>, Vec<PeerHandle>) =
            peers.into_iter().partition(PeerHandle::is_closed);

        let timeout = self.config.send_timeout;
        let results = join_all(open.iter().map(|peer| {
            let frame = frame.clone();
            async move { (peer.id(), peer.send(frame, timeout).await) }
        }))
        .await;

        let mut delivery = Delivery::default();
        let closed = closed
            .iter()
            .map(|peer| (peer.id(), Err::<(), _>(DeliveryError::Closed)));
        for (id, result) in closed.chain(results) {
            match result {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        room = %self.code,
                        conn_id = %id,
                        error = %e,
                        "Peer delivery failed, evicting"
                    );
                    delivery.evicted.push(id);
                }
            }
        }

        for id in &delivery.evicted {
            self.leave(*id).await;
        }

        delivery
    }

    /// Number of members
    pub async fn member_count(&self) -> usize {
        self.inner.lock().await.members.len()
    }

    /// Member IDs in join order
    pub async fn member_ids(&self) -> Vec<ConnectionId> {
        self.inner
            .lock()
            .await
            .members
            .iter()
            .map(PeerHandle::id)
            .collect()
    }

    /// Whether the room has no members
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.members.is_empty()
    }

    /// Recent frames, oldest first
    pub async fn history(&self) -> Vec<RelayFrame> {
        self.inner.lock().await.history.iter().cloned().collect()
    }

    /// Current statistics
    pub async fn stats(&self) -> RoomStats {
        let inner = self.inner.lock().await;
        RoomStats {
            members: inner.members.len(),
            capacity: self.capacity(),
            history_len: inner.history.len(),
            age: self.created_at.elapsed(),
        }
    }

    /// Mark the room retired if it has no members
    ///
    /// Called by the registry while holding its write lock, so no join can
    /// reach this room through the map afterwards.
    pub(super) async fn retire_if_empty(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.members.is_empty() {
            inner.retired = true;
            inner.history.clear();
            true
        } else {
            false
        }
    }

    /// Retire the room and drop every member handle
    ///
    /// Returns the number of members that were dropped.
    pub(super) async fn retire(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.retired = true;
        inner.history.clear();
        let dropped = inner.members.len();
        inner.members.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn room(capacity: usize) -> Room {
        Room::new(
            RoomCode::new("abc"),
            RoomConfig::default()
                .capacity(capacity)
                .send_timeout(Duration::from_millis(50)),
        )
    }

    fn peer(id: u64) -> (PeerHandle, mpsc::Receiver<RelayFrame>) {
        PeerHandle::channel(ConnectionId(id), 8)
    }

    #[tokio::test]
    async fn test_join_until_full() {
        let room = room(2);
        let (a, _rx_a) = peer(1);
        let (b, _rx_b) = peer(2);
        let (c, _rx_c) = peer(3);

        assert_eq!(assert_ok!(room.try_join(a).await).members, 1);
        assert_eq!(assert_ok!(room.try_join(b).await).members, 2);

        let rejection = assert_err!(room.try_join(c).await);
        assert_eq!(rejection.reason, RejectReason::RoomFull);
        assert_eq!(rejection.into_peer().id(), ConnectionId(3));

        assert_eq!(room.member_ids().await, vec![ConnectionId(1), ConnectionId(2)]);
    }

    #[tokio::test]
    async fn test_duplicate_join_rejected() {
        let room = room(4);
        let (a, _rx) = peer(1);

        room.try_join(a.clone()).await.unwrap();
        let rejection = room.try_join(a).await.unwrap_err();

        assert_eq!(rejection.reason, RejectReason::AlreadyJoined);
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let room = room(2);
        let (a, _rx_a) = peer(1);
        let (b, _rx_b) = peer(2);
        room.try_join(a).await.unwrap();
        room.try_join(b).await.unwrap();

        assert!(room.leave(ConnectionId(2)).await);
        assert!(!room.leave(ConnectionId(2)).await);

        assert_eq!(room.member_ids().await, vec![ConnectionId(1)]);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let room = room(2);
        let (a, mut rx_a) = peer(1);
        let (b, mut rx_b) = peer(2);
        room.try_join(a).await.unwrap();
        room.try_join(b).await.unwrap();

        let delivery = room.broadcast(ConnectionId(1), RelayFrame::text("hello")).await;
        assert_eq!(delivery.delivered, 1);
        assert!(delivery.evicted.is_empty());

        assert_eq!(rx_b.recv().await.unwrap().as_text(), Some("hello"));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_alone() {
        let room = room(2);
        let (a, mut rx_a) = peer(1);
        room.try_join(a).await.unwrap();

        let delivery = room.broadcast(ConnectionId(1), RelayFrame::text("hi")).await;

        assert_eq!(delivery, Delivery::default());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_peer_does_not_block_others() {
        let room = room(3);
        let (a, _rx_a) = peer(1);
        let (b, rx_b) = peer(2);
        let (c, mut rx_c) = peer(3);
        room.try_join(a).await.unwrap();
        room.try_join(b).await.unwrap();
        room.try_join(c).await.unwrap();

        // B's writer is gone
        drop(rx_b);

        let delivery = room.broadcast(ConnectionId(1), RelayFrame::text("hello")).await;

        assert_eq!(delivery.delivered, 1);
        assert_eq!(delivery.evicted, vec![ConnectionId(2)]);
        assert_eq!(rx_c.recv().await.unwrap().as_text(), Some("hello"));
        assert_eq!(room.member_ids().await, vec![ConnectionId(1), ConnectionId(3)]);
    }

    #[tokio::test]
    async fn test_stalled_peer_is_evicted() {
        let room = room(3);
        let (a, _rx_a) = peer(1);
        let (b, _rx_b) = PeerHandle::channel(ConnectionId(2), 1);
        let (c, mut rx_c) = peer(3);
        room.try_join(a).await.unwrap();
        room.try_join(b).await.unwrap();
        room.try_join(c).await.unwrap();

        // Fill B's only slot; B never drains it
        room.broadcast(ConnectionId(1), RelayFrame::text("one")).await;
        let delivery = room.broadcast(ConnectionId(1), RelayFrame::text("two")).await;

        assert_eq!(delivery.evicted, vec![ConnectionId(2)]);
        assert_eq!(rx_c.recv().await.unwrap().as_text(), Some("one"));
        assert_eq!(rx_c.recv().await.unwrap().as_text(), Some("two"));
        assert_eq!(room.member_count().await, 2);
    }

    #[tokio::test]
    async fn test_non_member_cannot_broadcast() {
        let room = room(2);
        let (a, mut rx_a) = peer(1);
        room.try_join(a).await.unwrap();

        let delivery = room.broadcast(ConnectionId(9), RelayFrame::text("spam")).await;

        assert_eq!(delivery.delivered, 0);
        assert!(rx_a.try_recv().is_err());
        assert!(room.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let room = Room::new(
            RoomCode::new("abc"),
            RoomConfig::default().history_limit(2),
        );
        let (a, _rx) = peer(1);
        room.try_join(a).await.unwrap();

        for text in ["one", "two", "three"] {
            room.broadcast(ConnectionId(1), RelayFrame::text(text)).await;
        }

        let history = room.history().await;
        let texts: Vec<_> = history.iter().filter_map(RelayFrame::as_text).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_history_disabled() {
        let room = Room::new(
            RoomCode::new("abc"),
            RoomConfig::default().history_limit(0),
        );
        let (a, _rx) = peer(1);
        room.try_join(a).await.unwrap();

        room.broadcast(ConnectionId(1), RelayFrame::text("one")).await;

        assert!(room.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_replay_history_on_join() {
        let room = Room::new(
            RoomCode::new("abc"),
            RoomConfig::default().replay_history(true),
        );
        let (a, _rx_a) = peer(1);
        room.try_join(a).await.unwrap();
        room.broadcast(ConnectionId(1), RelayFrame::text("earlier")).await;

        let (b, _rx_b) = peer(2);
        let admission = room.try_join(b).await.unwrap();

        assert_eq!(admission.catchup, vec![RelayFrame::text("earlier")]);
    }

    #[tokio::test]
    async fn test_retired_room_rejects() {
        let room = room(2);

        assert!(room.retire_if_empty().await);

        let (a, _rx) = peer(1);
        let rejection = room.try_join(a).await.unwrap_err();
        assert_eq!(rejection.reason, RejectReason::RoomClosed);
    }

    #[tokio::test]
    async fn test_retire_if_empty_keeps_occupied_room() {
        let room = room(2);
        let (a, _rx) = peer(1);
        room.try_join(a).await.unwrap();

        assert!(!room.retire_if_empty().await);

        let (b, _rx_b) = peer(2);
        assert!(room.try_join(b).await.is_ok());
    }

    #[tokio::test]
    async fn test_retire_drops_members() {
        let room = room(2);
        let (a, mut rx_a) = peer(1);
        room.try_join(a).await.unwrap();

        assert_eq!(room.retire().await, 1);
        assert!(room.is_empty().await);

        // The room held the last sender
        assert!(rx_a.recv().await.is_none());
    }
}
