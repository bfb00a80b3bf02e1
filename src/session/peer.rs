//! Peer send handles
//!
//! A [`PeerHandle`] is the room's view of a connection: a bounded channel
//! into the connection's writer task. Dropping every handle closes the
//! channel, which makes the writer send a close frame and exit.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::registry::RelayFrame;

/// Stable identity of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to hand a frame to one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The peer's writer task is gone
    #[error("peer channel closed")]
    Closed,
    /// The peer did not accept the frame before the send timeout
    #[error("peer send timed out")]
    TimedOut,
}

/// Non-owning send endpoint for a connection
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: ConnectionId,
    tx: mpsc::Sender<RelayFrame>,
}

impl PeerHandle {
    /// Wrap an existing sender
    pub fn new(id: ConnectionId, tx: mpsc::Sender<RelayFrame>) -> Self {
        Self { id, tx }
    }

    /// Create a handle together with the receiving end for a writer task
    pub fn channel(id: ConnectionId, buffer: usize) -> (Self, mpsc::Receiver<RelayFrame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(id, tx), rx)
    }

    /// Connection this handle points at
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame for the peer, waiting at most `timeout` for buffer space
    pub async fn send(&self, frame: RelayFrame, timeout: Duration) -> Result<(), DeliveryError> {
        match tokio::time::timeout(timeout, self.tx.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DeliveryError::Closed),
            Err(_) => Err(DeliveryError::TimedOut),
        }
    }

    /// Whether the writer side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
