//! Authoritative per-channel state and its command handlers.
//!
//! [`ChannelState`] is the single source of truth for one channel. Every
//! accepted command bumps the event id by exactly one; a rejected command
//! leaves the state untouched. Serializing access per channel is the
//! caller's job (the relay holds one lock per channel around `apply`).

use timing_types::{ChannelEvent, Command, EventId, MotionVector, Range, Rejection, Snapshot};

use crate::oracle::is_valid;

/// Authoritative record for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    event_id: EventId,
    vector: MotionVector,
    range: Range,
}

impl ChannelState {
    /// Initial state: event id 0, at rest at position 0 sampled at `now`,
    /// unbounded range.
    pub fn new(now: f64) -> Self {
        Self {
            event_id: EventId::zero(),
            vector: MotionVector::at_rest(now),
            range: Range::unbounded(),
        }
    }

    /// Id of the last accepted command.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Current authoritative vector.
    pub fn vector(&self) -> MotionVector {
        self.vector
    }

    /// Current range.
    pub fn range(&self) -> Range {
        self.range
    }

    /// The full state, as sent to new subscribers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            event_id: self.event_id,
            vector: self.vector,
            range: self.range,
        }
    }

    /// Apply a command. `now` is the authoritative clock reading used to
    /// stamp accepted updates.
    ///
    /// Returns the event to broadcast on success.
    pub fn apply(&mut self, command: Command, now: f64) -> Result<ChannelEvent, Rejection> {
        match command {
            Command::Update(vector) => self.update(vector, now),
            Command::SetRange(range) => self.set_range(range),
        }
    }

    /// Replace the vector. The proposed timestamp is discarded and
    /// replaced with `now`.
    pub fn update(&mut self, vector: MotionVector, now: f64) -> Result<ChannelEvent, Rejection> {
        if !(vector.position.is_finite()
            && vector.velocity.is_finite()
            && vector.acceleration.is_finite())
        {
            return Err(Rejection::Malformed {
                reason: format!("non-finite update vector {}", vector),
            });
        }
        if !is_valid(&vector, &self.range) {
            return Err(Rejection::RangeViolation {
                reason: format!("update vector {} outside range {}", vector, self.range),
            });
        }

        self.vector = vector.with_timestamp(now);
        self.event_id = self.event_id.next();
        Ok(ChannelEvent::new(Command::Update(self.vector), self.event_id))
    }

    /// Replace the range. The current vector must already satisfy the new
    /// range; it is never moved to fit.
    pub fn set_range(&mut self, range: Range) -> Result<ChannelEvent, Rejection> {
        if !is_valid(&self.vector, &range) {
            return Err(Rejection::RangeViolation {
                reason: format!("range {} excludes current vector {}", range, self.vector),
            });
        }

        self.range = range;
        self.event_id = self.event_id.next();
        Ok(ChannelEvent::new(Command::SetRange(range), self.event_id))
    }
}
