//! Participant readiness state machine.
//!
//! ```text
//! CONNECTING ──subscribed──► OPEN
//!     ▲                       │
//!     └──────connecting───────┘
//!
//! any ──destroy──► CLOSING ──done──► CLOSED
//! any ──closed──────────────────────► CLOSED (terminal)
//! ```

use std::fmt;

use crate::replica::ReplicaError;

/// Lifecycle of a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    /// Waiting for a live, authorized subscription.
    Connecting,
    /// Subscribed with a snapshot applied; reads and writes allowed.
    Open,
    /// Destroy in progress.
    Closing,
    /// Finished. No further transitions.
    Closed,
}

impl ReadyState {
    /// Process a link event and return the next state.
    ///
    /// Only a destroy request on an already closing/closed replica is an
    /// error; other events that don't apply leave the state unchanged.
    pub fn on_event(self, event: LinkEvent) -> Result<Self, ReplicaError> {
        use ReadyState::*;

        match (self, event) {
            (Closing | Closed, LinkEvent::DestroyRequested) => Err(ReplicaError::AlreadyDestroyed),
            (Closed, _) => Ok(Closed),
            (_, LinkEvent::Closed) => Ok(Closed),
            (Closing, LinkEvent::DestroyCompleted) => Ok(Closed),
            (Closing, _) => Ok(Closing),
            (_, LinkEvent::DestroyRequested) => Ok(Closing),
            (Connecting | Open, LinkEvent::Connecting) => Ok(Connecting),
            (Connecting | Open, LinkEvent::Subscribed) => Ok(Open),
            (state, LinkEvent::DestroyCompleted) => Ok(state),
        }
    }

    /// Whether the replica is on its way out or gone.
    pub fn is_closing_or_closed(&self) -> bool {
        matches!(self, ReadyState::Closing | ReadyState::Closed)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity and lifecycle events feeding [`ReadyState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Transport is (re)connecting.
    Connecting,
    /// Subscription granted and snapshot received.
    Subscribed,
    /// Transport closed.
    Closed,
    /// Application asked to destroy the replica.
    DestroyRequested,
    /// Destroy finished releasing the subscription.
    DestroyCompleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReadyState::*;

    #[test]
    fn subscribe_opens() {
        assert_eq!(Connecting.on_event(LinkEvent::Subscribed), Ok(Open));
    }

    #[test]
    fn reconnecting_leaves_open() {
        assert_eq!(Open.on_event(LinkEvent::Connecting), Ok(Connecting));
    }

    #[test]
    fn close_from_any_state() {
        for state in [Connecting, Open, Closing, Closed] {
            assert_eq!(state.on_event(LinkEvent::Closed), Ok(Closed));
        }
    }

    #[test]
    fn closed_is_terminal() {
        for event in [
            LinkEvent::Connecting,
            LinkEvent::Subscribed,
            LinkEvent::DestroyCompleted,
        ] {
            assert_eq!(Closed.on_event(event), Ok(Closed));
        }
    }

    #[test]
    fn destroy_goes_through_closing() {
        let state = Open.on_event(LinkEvent::DestroyRequested).unwrap();
        assert_eq!(state, Closing);
        // A late subscribe acknowledgement doesn't reopen.
        assert_eq!(state.on_event(LinkEvent::Subscribed), Ok(Closing));
        assert_eq!(state.on_event(LinkEvent::DestroyCompleted), Ok(Closed));
    }

    #[test]
    fn double_destroy_fails() {
        assert_eq!(
            Closing.on_event(LinkEvent::DestroyRequested),
            Err(ReplicaError::AlreadyDestroyed)
        );
        assert_eq!(
            Closed.on_event(LinkEvent::DestroyRequested),
            Err(ReplicaError::AlreadyDestroyed)
        );
    }

    #[test]
    fn destroy_completed_outside_closing_is_ignored() {
        assert_eq!(Open.on_event(LinkEvent::DestroyCompleted), Ok(Open));
        assert_eq!(Connecting.on_event(LinkEvent::DestroyCompleted), Ok(Connecting));
    }

    #[test]
    fn display_names() {
        assert_eq!(Open.to_string(), "open");
        assert_eq!(Closing.to_string(), "closing");
    }
}
