//! # timing-e2e-tests
//!
//! End-to-end harness wiring [`TimingProvider`](timing_client::TimingProvider)
//! replicas to an in-process relay [`Broker`](timing_relay::Broker).
//!
//! Participants talk to the broker through [`LocalTransport`], which feeds
//! encoded frames straight into a relay [`Session`](timing_relay::Session).
//! The full client stack (framing, correlation, replica, pinger) and the
//! full relay stack (authorization, store, fan-out) run unchanged; only the
//! socket is missing. All clocks are [`ManualClock`](timing_core::ManualClock)s
//! so positions and skews are exact.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod harness;
pub mod transport;

pub use harness::{settle, TestRelay};
pub use transport::LocalTransport;
