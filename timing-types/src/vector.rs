//! The synchronized quantity: motion vectors and their legal range.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TimingError;

/// A point-in-time sample of a quantity moving under constant acceleration.
///
/// Vectors are values: a newer vector supersedes an older one, it is never
/// edited in place. `timestamp` is in seconds on the authoritative clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionVector {
    /// Position at `timestamp`.
    pub position: f64,
    /// Velocity at `timestamp` (position units per second).
    pub velocity: f64,
    /// Constant acceleration (position units per second squared).
    pub acceleration: f64,
    /// Sample time in seconds.
    pub timestamp: f64,
}

impl MotionVector {
    /// Create a new vector.
    pub fn new(position: f64, velocity: f64, acceleration: f64, timestamp: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration,
            timestamp,
        }
    }

    /// A vector at position 0, not moving, sampled at `timestamp`.
    pub fn at_rest(timestamp: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, timestamp)
    }

    /// Copy of this vector with a different timestamp and unchanged motion.
    pub fn with_timestamp(self, timestamp: f64) -> Self {
        Self { timestamp, ..self }
    }
}

impl fmt::Display for MotionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{p={}, v={}, a={}, t={}}}",
            self.position, self.velocity, self.acceleration, self.timestamp
        )
    }
}

/// Closed interval `[start, end]` of legal positions.
///
/// Either bound may be infinite. Construction rejects NaN bounds and
/// `start > end`, including when decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub struct Range {
    start: f64,
    end: f64,
}

#[derive(Serialize, Deserialize)]
struct RangeRepr {
    start: f64,
    end: f64,
}

impl Range {
    /// Create a new range.
    pub fn new(start: f64, end: f64) -> Result<Self, TimingError> {
        if start.is_nan() || end.is_nan() || start > end {
            return Err(TimingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The range `[-inf, +inf]`.
    pub fn unbounded() -> Self {
        Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
        }
    }

    /// Lower bound.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Upper bound.
    pub fn end(&self) -> f64 {
        self.end
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl TryFrom<RangeRepr> for Range {
    type Error = TimingError;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        Range::new(repr.start, repr.end)
    }
}

impl From<Range> for RangeRepr {
    fn from(range: Range) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

/// A proposed change to a vector where only some fields are given.
///
/// Missing fields are taken from the current vector extrapolated to the
/// moment of the request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialVector {
    /// New position, if any.
    pub position: Option<f64>,
    /// New velocity, if any.
    pub velocity: Option<f64>,
    /// New acceleration, if any.
    pub acceleration: Option<f64>,
}

impl PartialVector {
    /// An empty proposal (keeps every field).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the position.
    pub fn position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the velocity.
    pub fn velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Set the acceleration.
    pub fn acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    /// Lay the supplied fields over `base`.
    pub fn overlay(&self, base: MotionVector) -> MotionVector {
        MotionVector {
            position: self.position.unwrap_or(base.position),
            velocity: self.velocity.unwrap_or(base.velocity),
            acceleration: self.acceleration.unwrap_or(base.acceleration),
            timestamp: base.timestamp,
        }
    }
}
