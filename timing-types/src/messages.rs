//! Transport frames exchanged between participants and the relay.
//!
//! These are the pub/sub primitives the timing protocol rides on:
//! subscribe with a snapshot reply, publish with an ack or rejection,
//! channel event fan-out, and a request/response `invoke` used for pings.

use serde::{Deserialize, Serialize};

use crate::{ChannelEvent, ChannelId, Credential, EventId, Rejection, RequestId, Snapshot, TimingError};

/// Default upper bound on one encoded frame (64 KiB).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Name of the round-trip procedure answering with the relay clock.
pub const PING_PROCEDURE: &str = "ping";

/// All possible transport frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// Participant asks to join a channel.
    Subscribe {
        /// Target channel.
        channel: ChannelId,
        /// Claims authorizing the subscription.
        credential: Credential,
    },
    /// Subscription granted, with the channel's current state.
    Subscribed {
        /// The channel joined.
        channel: ChannelId,
        /// Authoritative state at subscribe time.
        snapshot: Snapshot,
    },
    /// Subscription refused.
    SubscribeFailed {
        /// The channel requested.
        channel: ChannelId,
        /// Why it was refused.
        rejection: Rejection,
    },
    /// Participant leaves a channel.
    Unsubscribe {
        /// The channel to leave.
        channel: ChannelId,
    },
    /// Participant submits a command.
    Publish {
        /// Correlation id for the ack.
        request_id: RequestId,
        /// Target channel.
        channel: ChannelId,
        /// MessagePack-encoded [`Command`](crate::Command), opaque to the transport.
        command: Vec<u8>,
    },
    /// The command was accepted and broadcast.
    PublishAck {
        /// Correlation id of the publish.
        request_id: RequestId,
        /// Event id assigned to the command.
        event_id: EventId,
    },
    /// The command was refused; channel state is unchanged.
    PublishRejected {
        /// Correlation id of the publish.
        request_id: RequestId,
        /// Why it was refused.
        rejection: Rejection,
    },
    /// A channel event delivered to a subscriber.
    Event {
        /// Source channel.
        channel: ChannelId,
        /// The accepted command and its event id.
        event: ChannelEvent,
    },
    /// Request/response procedure call.
    Invoke {
        /// Correlation id for the result.
        request_id: RequestId,
        /// Procedure name (e.g. `"ping"`).
        name: String,
        /// Numeric argument.
        payload: f64,
    },
    /// Procedure result.
    InvokeResult {
        /// Correlation id of the invoke.
        request_id: RequestId,
        /// Numeric result.
        payload: f64,
    },
    /// Procedure failed.
    InvokeFailed {
        /// Correlation id of the invoke.
        request_id: RequestId,
        /// Failure description.
        reason: String,
    },
}

impl Message {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TimingError> {
        rmp_serde::to_vec_named(self).map_err(TimingError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TimingError> {
        rmp_serde::from_slice(bytes).map_err(TimingError::Deserialization)
    }

    /// The frame's `kind` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Subscribe { .. } => "subscribe",
            Message::Subscribed { .. } => "subscribed",
            Message::SubscribeFailed { .. } => "subscribeFailed",
            Message::Unsubscribe { .. } => "unsubscribe",
            Message::Publish { .. } => "publish",
            Message::PublishAck { .. } => "publishAck",
            Message::PublishRejected { .. } => "publishRejected",
            Message::Event { .. } => "event",
            Message::Invoke { .. } => "invoke",
            Message::InvokeResult { .. } => "invokeResult",
            Message::InvokeFailed { .. } => "invokeFailed",
        }
    }

    /// Request id for request/response frames.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Message::Publish { request_id, .. }
            | Message::PublishAck { request_id, .. }
            | Message::PublishRejected { request_id, .. }
            | Message::Invoke { request_id, .. }
            | Message::InvokeResult { request_id, .. }
            | Message::InvokeFailed { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }
}
