//! Identity and ordering types for the timing protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a logical channel carrying one synchronized timing object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The channel name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

/// A monotonically increasing counter ordering accepted commands on a channel.
///
/// Assigned by the authoritative side, never by participants. Replicas
/// compare event ids rather than timestamps because clocks drift.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Create an EventId with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id of a freshly created channel (no commands applied yet).
    pub fn zero() -> Self {
        Self(0)
    }

    /// The id following this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

/// Correlates a request frame with its response on one connection.
pub type RequestId = u64;

/// Claims presented when subscribing to a channel.
///
/// Token signature checking happens before these claims reach the relay;
/// here we only carry what was granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The one channel this credential is scoped to.
    pub channel: ChannelId,
    /// Optional identity of the bearer, for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Credential {
    /// A credential scoped to `channel`.
    pub fn for_channel(channel: ChannelId) -> Self {
        Self {
            channel,
            subject: None,
        }
    }

    /// Attach a subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Whether this credential grants access to `channel`.
    pub fn grants(&self, channel: &ChannelId) -> bool {
        &self.channel == channel
    }
}
