//! Transport-independent command handling.
//!
//! The [`Broker`] is what a pub/sub substrate talks to: it authorizes
//! subscribe and publish requests, decodes command envelopes and applies
//! them to the [`ChannelStore`], and answers procedure calls. It knows
//! nothing about sockets; [`Session`](crate::session::Session) adapts it to
//! a connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use timing_core::Clock;
use timing_types::{ChannelId, Command, Credential, EventId, Rejection, Snapshot, PING_PROCEDURE};

use crate::auth::{Authorizer, ChannelScoped};
use crate::store::{ChannelFeed, ChannelStore};

/// Operational metrics for monitoring relay activity.
///
/// Counters only increase (reset on restart). `sessions_active` is a gauge.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Commands accepted and broadcast.
    pub commands_accepted: AtomicU64,
    /// Commands rejected (range, unknown kind, malformed, unauthorized).
    pub commands_rejected: AtomicU64,
    /// Subscriptions granted.
    pub subscriptions_granted: AtomicU64,
    /// Subscriptions refused.
    pub subscriptions_denied: AtomicU64,
    /// Ping procedure calls answered.
    pub pings_total: AtomicU64,
    /// Connections accepted.
    pub connections_total: AtomicU64,
    /// Protocol errors (bad frames, unexpected messages, timeouts).
    pub errors_total: AtomicU64,
    /// Sessions currently open.
    pub sessions_active: AtomicU64,
}

impl RelayMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Authoritative command handling for every channel.
#[derive(Debug)]
pub struct Broker {
    store: ChannelStore,
    authorizer: Arc<dyn Authorizer>,
    metrics: RelayMetrics,
}

impl Broker {
    /// A broker reading authoritative time from `clock`, using the
    /// [`ChannelScoped`] policy.
    pub fn new(clock: Arc<dyn Clock>, event_buffer: usize) -> Self {
        Self {
            store: ChannelStore::new(clock, event_buffer),
            authorizer: Arc::new(ChannelScoped),
            metrics: RelayMetrics::default(),
        }
    }

    /// Replace the authorization policy.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// The channel store.
    pub fn store(&self) -> &ChannelStore {
        &self.store
    }

    /// Operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Join `channel`, returning its snapshot and the events that follow.
    pub fn subscribe(
        &self,
        channel: &ChannelId,
        credential: &Credential,
    ) -> Result<ChannelFeed, Rejection> {
        if let Err(rejection) = self.authorizer.authorize_subscribe(channel, credential) {
            RelayMetrics::incr(&self.metrics.subscriptions_denied);
            tracing::warn!("Subscribe to {} refused: {}", channel, rejection);
            return Err(rejection);
        }

        let feed = self.store.subscribe(channel);
        RelayMetrics::incr(&self.metrics.subscriptions_granted);
        tracing::debug!(
            "Subscribed {:?} to {} at event {}",
            credential.subject,
            channel,
            feed.snapshot.event_id
        );
        Ok(feed)
    }

    /// Decode and apply a command envelope published on `channel`.
    ///
    /// `subscription` is the publisher's live subscription credential for
    /// `channel`, if any. On success the event has already been broadcast.
    pub fn publish(
        &self,
        channel: &ChannelId,
        envelope: &[u8],
        subscription: Option<&Credential>,
    ) -> Result<EventId, Rejection> {
        let result = self
            .authorizer
            .authorize_publish(channel, subscription)
            .and_then(|()| Command::from_bytes(envelope))
            .and_then(|command| self.store.apply(channel, command));

        match result {
            Ok(event) => {
                RelayMetrics::incr(&self.metrics.commands_accepted);
                tracing::debug!(
                    "Accepted {} on {} as event {}",
                    event.command().kind().as_str(),
                    channel,
                    event.event_id()
                );
                Ok(event.event_id())
            }
            Err(rejection) => {
                RelayMetrics::incr(&self.metrics.commands_rejected);
                tracing::warn!("Rejected command on {}: {}", channel, rejection);
                Err(rejection)
            }
        }
    }

    /// Run a named procedure.
    ///
    /// Only `"ping"` exists: it ignores its argument and answers with the
    /// authoritative clock.
    pub fn invoke(&self, name: &str, _payload: f64) -> Result<f64, String> {
        match name {
            PING_PROCEDURE => {
                RelayMetrics::incr(&self.metrics.pings_total);
                Ok(self.store.clock().now())
            }
            other => {
                tracing::warn!("Unknown procedure {:?}", other);
                Err(format!("unknown procedure: {}", other))
            }
        }
    }

    /// Current state of `channel`.
    pub fn snapshot(&self, channel: &ChannelId) -> Snapshot {
        self.store.snapshot(channel)
    }
}
