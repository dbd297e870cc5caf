//! # timing-relay
//!
//! Authoritative relay server for shared timing objects.
//!
//! This crate implements the side of the protocol that owns the truth:
//! - Keeps one authoritative `{eventId, vector, range}` per channel
//! - Validates every command against the channel's range before applying it
//! - Stamps accepted updates with its own clock and fans them out in order
//! - Answers pings with its clock so participants can estimate skew
//!
//! ## Architecture
//!
//! ```text
//! Participant A ──┐                   ┌── Participant B
//!                 │  length-prefixed  │
//!                 ├──── MessagePack ──┤
//!                 │                   │
//!          ┌──────┴───────────────────┴──────┐
//!          │          timing-relay           │
//!          │  Session ─► Broker ─► Store     │
//!          │     ▲                   │       │
//!          │     └──── broadcast ◄───┘       │
//!          └─────────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! - subscribe → subscribed (snapshot) | subscribeFailed
//! - publish → publishAck (eventId) | publishRejected, plus an `event`
//!   to every subscriber of the channel
//! - invoke("ping") → invokeResult (relay clock)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod broker;
pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod session;
pub mod store;

pub use auth::{Authorizer, ChannelScoped};
pub use broker::{Broker, RelayMetrics};
pub use config::Config;
pub use server::TimingRelay;
pub use session::Session;
pub use store::{ChannelFeed, ChannelStore};
