//! # timing-types
//!
//! Wire format types for the shared timing object protocol.
//!
//! This crate provides the foundational types used across all timing crates:
//! - [`MotionVector`], [`Range`], [`PartialVector`] - The synchronized quantity
//! - [`ChannelId`], [`EventId`], [`Credential`] - Identity and ordering types
//! - [`Command`], [`ChannelEvent`], [`Snapshot`] - Authoritative commands and broadcasts
//! - [`Message`] - Transport frames exchanged between participants and the relay
//! - [`Rejection`], [`TimingError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod error;
mod ids;
mod messages;
mod vector;

pub use command::{ChannelEvent, Command, CommandKind, Snapshot};
pub use error::{Rejection, TimingError};
pub use ids::{ChannelId, Credential, EventId, RequestId};
pub use messages::{Message, MAX_MESSAGE_SIZE, PING_PROCEDURE};
pub use vector::{MotionVector, PartialVector, Range};
