//! # timing-core
//!
//! Pure logic for shared timing objects (no I/O, instant tests).
//!
//! This crate implements the state machines and numeric algorithms of the
//! timing protocol without any network or timer I/O:
//!
//! - [`oracle`]: the range validity check every command passes through
//! - [`kinematics`]: constant-acceleration extrapolation
//! - [`authority`]: the authoritative per-channel state and its command handlers
//! - [`skew`]: minimum-latency clock skew estimation
//! - [`cadence`]: the adaptive ping schedule
//! - [`readiness`] and [`replica`]: the participant-side state machines
//!
//! ## Design Philosophy
//!
//! Every module here is **pure**: inputs in, values out. Time is passed in
//! explicitly (or read through the [`Clock`] trait) so tests are
//! deterministic. The actual I/O (sockets, timers, fan-out) lives in
//! `timing-client` and `timing-relay`, which interpret what these state
//! machines return.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authority;
pub mod cadence;
pub mod clock;
pub mod kinematics;
pub mod oracle;
pub mod readiness;
pub mod replica;
pub mod skew;

pub use authority::ChannelState;
pub use cadence::{PingCadence, DEFAULT_STEADY_INTERVAL};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use kinematics::extrapolate;
pub use oracle::is_valid;
pub use readiness::{LinkEvent, ReadyState};
pub use replica::{Notification, NotificationKind, Replica, ReplicaError};
pub use skew::{SkewEstimator, SkewSample, DEFAULT_WINDOW};
