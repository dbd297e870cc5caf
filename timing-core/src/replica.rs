//! Participant-side reconstruction of a channel's timing object.
//!
//! A [`Replica`] is a read-only projection of the authoritative state. It
//! adopts the snapshot received on subscribe, then applies broadcast events
//! in event id order, dropping anything stale or duplicated. Reads
//! extrapolate the last authoritative vector to the server clock, which is
//! the local clock corrected by the estimated skew.
//!
//! Every mutating method returns the [`Notification`]s the caller should
//! dispatch; nothing here calls out.

use thiserror::Error;
use timing_types::{ChannelEvent, Command, EventId, MotionVector, PartialVector, Range, Snapshot};

use crate::kinematics::extrapolate;
use crate::readiness::{LinkEvent, ReadyState};
use crate::skew::{SkewEstimator, SkewSample};

/// Replica-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplicaError {
    /// Mutation requested while not open.
    #[error("the timing provider is not open")]
    NotOpen,

    /// Destroy requested twice.
    #[error("the timing provider is already destroyed")]
    AlreadyDestroyed,
}

/// Notification categories observers can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The authoritative vector or range changed.
    VectorChange,
    /// The skew estimate changed.
    SkewChange,
    /// The ready state changed.
    ReadyStateChange,
}

/// A local change observers may care about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    /// New authoritative vector and range.
    VectorChange {
        /// The last authoritative vector.
        vector: MotionVector,
        /// The current range.
        range: Range,
    },
    /// New skew estimate in seconds.
    SkewChange(f64),
    /// New ready state.
    ReadyStateChange(ReadyState),
}

impl Notification {
    /// Category of this notification.
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::VectorChange { .. } => NotificationKind::VectorChange,
            Notification::SkewChange(_) => NotificationKind::SkewChange,
            Notification::ReadyStateChange(_) => NotificationKind::ReadyStateChange,
        }
    }
}

/// Replica state for one participant.
#[derive(Debug, Clone)]
pub struct Replica {
    ready_state: ReadyState,
    last_event_id: Option<EventId>,
    vector: Option<MotionVector>,
    range: Range,
    skew: SkewEstimator,
}

impl Replica {
    /// A connecting replica keeping `window` skew samples.
    pub fn new(window: usize) -> Self {
        Self {
            ready_state: ReadyState::Connecting,
            last_event_id: None,
            vector: None,
            range: Range::unbounded(),
            skew: SkewEstimator::new(window),
        }
    }

    /// Current ready state.
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Id of the last applied event, `None` before the snapshot.
    pub fn last_event_id(&self) -> Option<EventId> {
        self.last_event_id
    }

    /// Last authoritative vector (not extrapolated).
    pub fn vector(&self) -> Option<MotionVector> {
        self.vector
    }

    /// Current range.
    pub fn range(&self) -> Range {
        self.range
    }

    /// Lower bound of the range.
    pub fn start_position(&self) -> f64 {
        self.range.start()
    }

    /// Upper bound of the range.
    pub fn end_position(&self) -> f64 {
        self.range.end()
    }

    /// Current skew estimate, `None` until the first ping sample.
    pub fn skew(&self) -> Option<f64> {
        self.skew.skew()
    }

    /// Feed a link event through the readiness machine.
    pub fn on_link(&mut self, event: LinkEvent) -> Result<Option<Notification>, ReplicaError> {
        let next = self.ready_state.on_event(event)?;
        Ok(self.set_ready_state(next))
    }

    /// Adopt a snapshot and open.
    ///
    /// The relay sends one on subscribe and again to resynchronize a
    /// subscriber that fell behind. The state of a snapshot no newer than
    /// the last applied event is ignored, but it still opens a connecting
    /// replica. Nothing happens once closing or closed.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Vec<Notification> {
        if self.ready_state.is_closing_or_closed() {
            return Vec::new();
        }

        let mut notifications = Vec::new();
        let stale = self
            .last_event_id
            .is_some_and(|last| snapshot.event_id <= last);
        if !stale {
            self.last_event_id = Some(snapshot.event_id);
            self.vector = Some(snapshot.vector);
            self.range = snapshot.range;
            notifications.push(Notification::VectorChange {
                vector: snapshot.vector,
                range: snapshot.range,
            });
        }

        if let Ok(Some(n)) = self.on_link(LinkEvent::Subscribed) {
            notifications.push(n);
        }
        notifications
    }

    /// Apply a broadcast event if it is newer than the last one applied.
    ///
    /// Stale and duplicate events (id not greater than the last applied id)
    /// are dropped and yield `None`. Events are also dropped once closing
    /// or closed.
    pub fn apply_event(&mut self, event: ChannelEvent) -> Option<Notification> {
        if self.ready_state.is_closing_or_closed() {
            return None;
        }
        if let Some(last) = self.last_event_id {
            if event.event_id() <= last {
                return None;
            }
        }

        self.last_event_id = Some(event.event_id());
        match event.command() {
            Command::Update(vector) => self.vector = Some(vector),
            Command::SetRange(range) => self.range = range,
        }

        self.vector.map(|vector| Notification::VectorChange {
            vector,
            range: self.range,
        })
    }

    /// Record a ping round trip.
    pub fn record_sample(&mut self, sample: SkewSample) -> Option<Notification> {
        self.skew.record(sample).map(Notification::SkewChange)
    }

    /// Convert a local clock reading to the server clock.
    pub fn server_time(&self, local_now: f64) -> f64 {
        local_now + self.skew.skew().unwrap_or(0.0)
    }

    /// The authoritative vector extrapolated to server time `at`.
    pub fn vector_at(&self, at: f64) -> Option<MotionVector> {
        self.vector.map(|v| extrapolate(&v, at))
    }

    /// The authoritative vector extrapolated to the corrected clock.
    pub fn current_vector(&self, local_now: f64) -> Option<MotionVector> {
        self.vector_at(self.server_time(local_now))
    }

    /// Build an update command from the supplied fields laid over the
    /// current extrapolated vector.
    pub fn propose_update(
        &self,
        partial: PartialVector,
        local_now: f64,
    ) -> Result<Command, ReplicaError> {
        self.ensure_open()?;
        let base = self
            .current_vector(local_now)
            .ok_or(ReplicaError::NotOpen)?;
        Ok(Command::Update(partial.overlay(base)))
    }

    /// Build a set-range command.
    pub fn propose_range(&self, range: Range) -> Result<Command, ReplicaError> {
        self.ensure_open()?;
        Ok(Command::SetRange(range))
    }

    fn ensure_open(&self) -> Result<(), ReplicaError> {
        if self.ready_state == ReadyState::Open {
            Ok(())
        } else {
            Err(ReplicaError::NotOpen)
        }
    }

    fn set_ready_state(&mut self, next: ReadyState) -> Option<Notification> {
        if next == self.ready_state {
            return None;
        }
        self.ready_state = next;
        Some(Notification::ReadyStateChange(next))
    }
}

impl Default for Replica {
    fn default() -> Self {
        Self::new(crate::skew::DEFAULT_WINDOW)
    }
}
