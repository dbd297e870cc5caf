//! Commands against the authoritative state and the events they produce.

use serde::{Deserialize, Serialize};

use crate::{EventId, MotionVector, Range, Rejection, TimingError};

/// Command kind discriminator, as it appears in the `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Replace the channel's motion vector.
    Update,
    /// Replace the channel's range.
    SetRange,
}

impl CommandKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Update => "update",
            CommandKind::SetRange => "setRange",
        }
    }

    /// Parse a wire tag. Returns `None` for unrecognized kinds.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "update" => Some(CommandKind::Update),
            "setRange" => Some(CommandKind::SetRange),
            _ => None,
        }
    }
}

/// A command envelope: `{type: "update", payload}` or `{type: "setRange", payload}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Command {
    /// Replace the motion vector. The timestamp is re-stamped by the
    /// authoritative side.
    Update(MotionVector),
    /// Replace the range. The current vector must already satisfy it.
    SetRange(Range),
}

impl Command {
    /// The kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Update(_) => CommandKind::Update,
            Command::SetRange(_) => CommandKind::SetRange,
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TimingError> {
        rmp_serde::to_vec_named(self).map_err(TimingError::Serialization)
    }

    /// Decode a command envelope.
    ///
    /// The `type` tag is inspected first so that an unrecognized kind is
    /// reported as [`Rejection::UnknownCommand`] rather than a decode failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Rejection> {
        #[derive(Deserialize)]
        struct Tag {
            #[serde(rename = "type")]
            kind: String,
        }

        let tag: Tag = rmp_serde::from_slice(bytes).map_err(|e| Rejection::Malformed {
            reason: e.to_string(),
        })?;
        if CommandKind::from_tag(&tag.kind).is_none() {
            return Err(Rejection::UnknownCommand { kind: tag.kind });
        }
        rmp_serde::from_slice(bytes).map_err(|e| Rejection::Malformed {
            reason: e.to_string(),
        })
    }
}

/// An accepted command as broadcast to subscribers: `{type, payload, eventId}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChannelEvent {
    /// The vector was replaced.
    Update {
        /// The authoritative (server-stamped) vector.
        payload: MotionVector,
        /// Post-increment event id.
        event_id: EventId,
    },
    /// The range was replaced.
    SetRange {
        /// The new range.
        payload: Range,
        /// Post-increment event id.
        event_id: EventId,
    },
}

impl ChannelEvent {
    /// Pair an accepted command with its event id.
    pub fn new(command: Command, event_id: EventId) -> Self {
        match command {
            Command::Update(payload) => ChannelEvent::Update { payload, event_id },
            Command::SetRange(payload) => ChannelEvent::SetRange { payload, event_id },
        }
    }

    /// The event id assigned by the authoritative side.
    pub fn event_id(&self) -> EventId {
        match self {
            ChannelEvent::Update { event_id, .. } | ChannelEvent::SetRange { event_id, .. } => {
                *event_id
            }
        }
    }

    /// The command carried by this event.
    pub fn command(&self) -> Command {
        match self {
            ChannelEvent::Update { payload, .. } => Command::Update(*payload),
            ChannelEvent::SetRange { payload, .. } => Command::SetRange(*payload),
        }
    }
}

/// The full authoritative state of a channel at one event id.
///
/// Sent once on subscribe; replicas apply later events on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Id of the last accepted command (0 when none).
    pub event_id: EventId,
    /// Current vector.
    pub vector: MotionVector,
    /// Current range.
    pub range: Range,
}
