//! Connection state machines
//!
//! Two independent lifecycles are tracked for every connection: transport
//! liveness ([`ConnectionState`]) and room membership ([`MembershipPhase`]).

/// Transport liveness of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP accepted, WebSocket handshake not finished
    Connecting,
    /// Handshake complete, frames may flow
    Open,
    /// Connection closed (terminal)
    Closed,
}

impl ConnectionState {
    /// Mark the handshake as complete
    pub fn open(&mut self) {
        if *self == ConnectionState::Connecting {
            *self = ConnectionState::Open;
        }
    }

    /// Close the connection
    pub fn close(&mut self) {
        *self = ConnectionState::Closed;
    }

    /// Whether frames may be exchanged
    pub fn is_open(&self) -> bool {
        *self == ConnectionState::Open
    }
}

/// Membership of a connection in its room
///
/// `Unjoined → Joined → Left`. `Left` is terminal: a client that leaves has
/// to open a new connection to rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipPhase {
    /// Not (yet) admitted to a room
    Unjoined,
    /// Admitted and receiving fan-out
    Joined,
    /// Removed from the room
    Left,
}

impl MembershipPhase {
    /// Transition to `Joined`
    ///
    /// Returns `false` if the connection was not `Unjoined`.
    pub fn join(&mut self) -> bool {
        if *self == MembershipPhase::Unjoined {
            *self = MembershipPhase::Joined;
            true
        } else {
            false
        }
    }

    /// Transition to `Left`
    ///
    /// Returns `true` only for the first call made while `Joined`, so
    /// callers can use it to run teardown exactly once.
    pub fn leave(&mut self) -> bool {
        if *self == MembershipPhase::Joined {
            *self = MembershipPhase::Left;
            true
        } else {
            false
        }
    }

    /// Whether the connection currently belongs to a room
    pub fn is_joined(&self) -> bool {
        *self == MembershipPhase::Joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_lifecycle() {
        let mut state = ConnectionState::Connecting;
        assert!(!state.is_open());

        state.open();
        assert!(state.is_open());

        state.close();
        assert_eq!(state, ConnectionState::Closed);

        // Closed never reopens
        state.open();
        assert_eq!(state, ConnectionState::Closed);
    }

    #[test]
    fn test_membership_lifecycle() {
        let mut phase = MembershipPhase::Unjoined;

        assert!(phase.join());
        assert!(phase.is_joined());
        assert!(!phase.join());

        assert!(phase.leave());
        assert_eq!(phase, MembershipPhase::Left);
    }

    #[test]
    fn test_leave_is_once() {
        let mut phase = MembershipPhase::Unjoined;
        phase.join();

        assert!(phase.leave());
        assert!(!phase.leave());
        assert_eq!(phase, MembershipPhase::Left);
    }

    #[test]
    fn test_left_is_terminal() {
        let mut phase = MembershipPhase::Unjoined;
        phase.join();
        phase.leave();

        assert!(!phase.join());
        assert_eq!(phase, MembershipPhase::Left);
    }

    #[test]
    fn test_unjoined_leave_is_noop() {
        let mut phase = MembershipPhase::Unjoined;
        assert!(!phase.leave());
        assert_eq!(phase, MembershipPhase::Unjoined);
    }
}
