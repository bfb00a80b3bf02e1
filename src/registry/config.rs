//! Room configuration

use std::time::Duration;

/// Default room capacity (one-to-one chat)
pub const DEFAULT_CAPACITY: usize = 2;

/// Default per-peer send timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of frames kept per room
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Configuration shared by every room in a registry
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum members per room (at least 1)
    pub capacity: usize,

    /// How long a broadcast waits on a single peer before evicting it
    pub send_timeout: Duration,

    /// Recent frames kept in memory per room (0 = no history)
    pub history_limit: usize,

    /// Send the room history to newly admitted members
    pub replay_history: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            replay_history: false,
        }
    }
}

impl RoomConfig {
    /// Set the room capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Set the per-peer send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set how many frames each room remembers
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Replay history to members as they join
    pub fn replay_history(mut self, enabled: bool) -> Self {
        self.replay_history = enabled;
        self
    }
}
