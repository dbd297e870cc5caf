//! Error types for the timing protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building or encoding timing types.
#[derive(Debug, Error)]
pub enum TimingError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Range bounds are NaN or out of order
    #[error("invalid range [{start}, {end}]")]
    InvalidRange {
        /// Requested lower bound.
        start: f64,
        /// Requested upper bound.
        end: f64,
    },

    /// A command was refused by the authoritative side
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// Why the authoritative side refused a command or subscription.
///
/// Rejections travel on the wire back to the submitter only; they are
/// never broadcast as channel data.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Rejection {
    /// The command would leave the vector outside its range.
    #[error("range violation: {reason}")]
    RangeViolation {
        /// Human-readable description of the offending vector/range.
        reason: String,
    },

    /// The command kind is not recognized.
    #[error("unknown command: {kind}")]
    UnknownCommand {
        /// The unrecognized `type` tag.
        kind: String,
    },

    /// The requester is not allowed to subscribe or publish here.
    #[error("not authorized: {reason}")]
    NotAuthorized {
        /// Why authorization failed.
        reason: String,
    },

    /// The command could not be decoded.
    #[error("malformed command: {reason}")]
    Malformed {
        /// Decoder error description.
        reason: String,
    },
}
