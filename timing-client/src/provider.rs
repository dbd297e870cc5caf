//! TimingProvider - the participant side of a shared timing object.
//!
//! This module provides [`TimingProvider`], the primary API for applications
//! to follow and steer a channel's motion vector.
//!
//! # Architecture
//!
//! The provider uses the pure [`Replica`] state machine (from timing-core)
//! for protocol logic and interprets what it returns to perform actual I/O
//! via the [`Transport`] trait.
//!
//! ```text
//! Application → TimingProvider → Transport → Relay
//!                     ↓    ↑
//!        timing-core   driver task (recv loop)
//!        (Replica)     pinger task (skew samples)
//! ```
//!
//! A driver task owns the receive side: it applies the subscribe snapshot
//! and broadcast events to the replica and routes request replies back to
//! their callers. Replica state sits behind a read/write lock so readers
//! never observe a half-applied event.
//!
//! # Example
//!
//! ```ignore
//! use timing_client::{ProviderConfig, TcpTransport, TimingProvider};
//! use timing_types::PartialVector;
//!
//! let provider = TimingProvider::new(
//!     ProviderConfig::new("room", "127.0.0.1:8000"),
//!     TcpTransport::new(),
//! );
//! provider.connect().await?;
//! provider.wait_open(Duration::from_secs(5)).await?;
//! provider.update(PartialVector::new().velocity(1.0)).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use timing_core::{
    Clock, LinkEvent, MonotonicClock, Notification, NotificationKind, ReadyState, Replica,
    ReplicaError, SkewSample,
};
use timing_types::{
    Command, EventId, Message, MotionVector, PartialVector, Range, Rejection, RequestId,
    TimingError, PING_PROCEDURE,
};
use tokio::sync::{oneshot, watch, RwLock};
use tokio::task::JoinHandle;

use crate::config::ProviderConfig;
use crate::events::{EventDispatcher, Handler};
use crate::pinger::{PingTarget, Pinger};
use crate::transport::{Transport, TransportError};

/// Provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The replica refused the request.
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame or command encoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] TimingError),

    /// The relay rejected a subscribe or publish.
    #[error("rejected: {0}")]
    Rejected(Rejection),

    /// A remote procedure failed.
    #[error("invoke failed: {0}")]
    InvokeFailed(String),

    /// The relay answered a ping with something that is not a clock reading.
    #[error("ping reply is not a finite time: {0}")]
    InvalidPingReply(f64),

    /// The relay answered with the wrong kind of frame.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(&'static str),

    /// The provider has closed and cannot be reused.
    #[error("the timing provider is closed")]
    Closed,
}

#[derive(Debug, Clone)]
struct Readiness {
    state: ReadyState,
    refused: Option<Rejection>,
}

type Pending = HashMap<RequestId, oneshot::Sender<Message>>;

/// State shared between the provider handle, the driver and the pinger.
struct Shared<T> {
    config: ProviderConfig,
    transport: T,
    clock: Arc<dyn Clock>,
    replica: RwLock<Replica>,
    dispatcher: EventDispatcher,
    pinger: Pinger,
    pending: Mutex<Pending>,
    next_request: AtomicU64,
    readiness: watch::Sender<Readiness>,
}

/// A replica of one channel's timing object.
///
/// Reads (`current_vector`, `skew`, ...) are local. Writes (`update`,
/// `set_range`) are proposals sent to the relay; the visible state changes
/// only when the resulting broadcast arrives.
pub struct TimingProvider<T: Transport + 'static> {
    shared: Arc<Shared<T>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport + 'static> TimingProvider<T> {
    /// Create a provider reading the local monotonic clock.
    pub fn new(config: ProviderConfig, transport: T) -> Self {
        Self::with_clock(config, transport, Arc::new(MonotonicClock::new()))
    }

    /// Create a provider reading `clock`.
    pub fn with_clock(config: ProviderConfig, transport: T, clock: Arc<dyn Clock>) -> Self {
        let replica = Replica::new(config.ping.window);
        let (readiness, _) = watch::channel(Readiness {
            state: replica.ready_state(),
            refused: None,
        });
        let shared = Shared {
            pinger: Pinger::new(config.ping.steady_interval),
            config,
            transport,
            clock,
            replica: RwLock::new(replica),
            dispatcher: EventDispatcher::new(),
            pending: Mutex::new(HashMap::new()),
            next_request: AtomicU64::new(0),
            readiness,
        };
        Self {
            shared: Arc::new(shared),
            driver: Mutex::new(None),
        }
    }

    /// Connect to the relay and request the subscription.
    ///
    /// Returns once the subscribe request is sent. The replica opens when
    /// the snapshot arrives; see [`wait_open`](Self::wait_open).
    pub async fn connect(&self) -> Result<(), ProviderError> {
        let shared = &self.shared;
        if shared.replica.read().await.ready_state().is_closing_or_closed() {
            return Err(ProviderError::Closed);
        }
        shared.link(LinkEvent::Connecting).await?;
        shared.readiness.send_modify(|r| r.refused = None);

        // The old receive loop must not see the old stream end.
        let previous = self.driver_slot().take();
        if let Some(previous) = previous {
            previous.abort();
            let _ = previous.await;
        }

        if let Err(e) = shared.transport.connect(&shared.config.relay_address).await {
            tracing::warn!("Connect to {} failed: {}", shared.config.relay_address, e);
            shared.link(LinkEvent::Closed).await.ok();
            return Err(e.into());
        }
        tracing::info!(
            "Connected to {} for channel {}",
            shared.config.relay_address,
            shared.config.channel
        );

        let driver = tokio::spawn(Arc::clone(shared).drive());
        *self.driver_slot() = Some(driver);

        shared
            .send(&Message::Subscribe {
                channel: shared.config.channel.clone(),
                credential: shared.config.credential.clone(),
            })
            .await?;

        shared.pinger.start(Arc::clone(shared) as Arc<dyn PingTarget>);
        Ok(())
    }

    /// Wait until the replica is open.
    ///
    /// Fails if the subscription is refused, the provider closes, or
    /// `timeout` elapses first.
    pub async fn wait_open(&self, timeout: Duration) -> Result<(), ProviderError> {
        let mut rx = self.shared.readiness.subscribe();
        let settled = tokio::time::timeout(
            timeout,
            rx.wait_for(|r| r.state != ReadyState::Connecting || r.refused.is_some()),
        )
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|_| ProviderError::Closed)?
        .clone();

        match settled {
            Readiness {
                state: ReadyState::Open,
                ..
            } => Ok(()),
            Readiness {
                refused: Some(rejection),
                ..
            } => Err(ProviderError::Rejected(rejection)),
            _ => Err(ProviderError::Closed),
        }
    }

    /// Propose new motion. Fields left out of `partial` keep the values of
    /// the current vector extrapolated to now.
    ///
    /// Before the first skew sample the server clock is unknown, so a ping
    /// round trip runs first and its failure fails the update.
    ///
    /// Returns the event id the relay assigned.
    pub async fn update(&self, partial: PartialVector) -> Result<EventId, ProviderError> {
        let needs_sample = {
            let replica = self.shared.replica.read().await;
            if replica.ready_state() != ReadyState::Open {
                return Err(ReplicaError::NotOpen.into());
            }
            replica.skew().is_none()
        };
        if needs_sample {
            self.shared.sample().await?;
        }

        let command = {
            let replica = self.shared.replica.read().await;
            replica.propose_update(partial, self.shared.clock.now())?
        };
        self.shared.publish(command).await
    }

    /// Propose a new range. The relay rejects it unless the current vector
    /// already satisfies it.
    pub async fn set_range(&self, range: Range) -> Result<EventId, ProviderError> {
        let command = self.shared.replica.read().await.propose_range(range)?;
        self.shared.publish(command).await
    }

    /// Release the subscription and close.
    ///
    /// Fails with [`ReplicaError::AlreadyDestroyed`] if called twice.
    pub async fn destroy(&self) -> Result<(), ProviderError> {
        let shared = &self.shared;
        shared.link(LinkEvent::DestroyRequested).await?;

        shared.pinger.pause();
        if let Some(driver) = self.driver_slot().take() {
            driver.abort();
        }
        if shared.transport.is_connected() {
            let unsubscribe = Message::Unsubscribe {
                channel: shared.config.channel.clone(),
            };
            if let Err(e) = shared.send(&unsubscribe).await {
                tracing::debug!("Unsubscribe not delivered: {}", e);
            }
        }
        shared.transport.close().await.ok();
        shared.fail_pending();

        shared.link(LinkEvent::DestroyCompleted).await?;
        tracing::info!("Provider for channel {} destroyed", shared.config.channel);
        Ok(())
    }

    /// Register a handler. Returns `false` if already registered for `kind`.
    pub fn on(&self, kind: NotificationKind, handler: Handler) -> bool {
        self.shared.dispatcher.on(kind, handler)
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn off(&self, kind: NotificationKind, handler: &Handler) -> bool {
        self.shared.dispatcher.off(kind, handler)
    }

    /// The replicated channel.
    pub fn channel(&self) -> &timing_types::ChannelId {
        &self.shared.config.channel
    }

    /// Current ready state.
    pub async fn ready_state(&self) -> ReadyState {
        self.shared.replica.read().await.ready_state()
    }

    /// Current skew estimate in seconds, `None` before the first ping.
    pub async fn skew(&self) -> Option<f64> {
        self.shared.replica.read().await.skew()
    }

    /// Last authoritative vector, not extrapolated.
    pub async fn vector(&self) -> Option<MotionVector> {
        self.shared.replica.read().await.vector()
    }

    /// Current range.
    pub async fn range(&self) -> Range {
        self.shared.replica.read().await.range()
    }

    /// Lower bound of the range.
    pub async fn start_position(&self) -> f64 {
        self.shared.replica.read().await.start_position()
    }

    /// Upper bound of the range.
    pub async fn end_position(&self) -> f64 {
        self.shared.replica.read().await.end_position()
    }

    /// Id of the last applied event.
    pub async fn last_event_id(&self) -> Option<EventId> {
        self.shared.replica.read().await.last_event_id()
    }

    /// The local clock corrected by the skew estimate.
    pub async fn server_time(&self) -> f64 {
        let now = self.shared.clock.now();
        self.shared.replica.read().await.server_time(now)
    }

    /// The vector extrapolated to the corrected clock.
    pub async fn current_vector(&self) -> Option<MotionVector> {
        let now = self.shared.clock.now();
        self.shared.replica.read().await.current_vector(now)
    }

    /// The vector extrapolated to server time `at`.
    pub async fn vector_at(&self, at: f64) -> Option<MotionVector> {
        self.shared.replica.read().await.vector_at(at)
    }

    /// Run one ping round trip now and record the sample.
    pub async fn ping(&self) -> Result<SkewSample, ProviderError> {
        self.shared.sample().await
    }

    fn driver_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport + 'static> Drop for TimingProvider<T> {
    fn drop(&mut self) {
        self.shared.pinger.pause();
        if let Some(driver) = self.driver_slot().take() {
            driver.abort();
        }
    }
}

impl<T: Transport + 'static> Shared<T> {
    /// Receive loop. Ends when the transport closes.
    async fn drive(self: Arc<Self>) {
        loop {
            match self.transport.recv().await {
                Ok(bytes) => match Message::from_bytes(&bytes) {
                    Ok(message) => self.handle(message).await,
                    Err(e) => tracing::warn!("Dropping undecodable frame: {}", e),
                },
                Err(e) => {
                    tracing::debug!("Receive loop ended: {}", e);
                    break;
                }
            }
        }
        self.on_disconnect().await;
    }

    async fn handle(&self, message: Message) {
        match message {
            Message::Subscribed { channel, snapshot } if channel == self.config.channel => {
                tracing::debug!(
                    "Subscribed to {} at event {}",
                    channel,
                    snapshot.event_id.value()
                );
                let notifications = self.replica.write().await.apply_snapshot(snapshot);
                self.emit(notifications);
            }
            Message::SubscribeFailed { channel, rejection } => {
                tracing::warn!("Subscribe to {} refused: {}", channel, rejection);
                self.readiness
                    .send_modify(|r| r.refused = Some(rejection));
            }
            Message::Event { channel, event } if channel == self.config.channel => {
                let event_id = event.event_id();
                let notification = self.replica.write().await.apply_event(event);
                match notification {
                    Some(n) => self.emit([n]),
                    None => tracing::debug!("Dropped stale event {}", event_id.value()),
                }
            }
            reply @ (Message::PublishAck { .. }
            | Message::PublishRejected { .. }
            | Message::InvokeResult { .. }
            | Message::InvokeFailed { .. }) => {
                let Some(request_id) = reply.request_id() else {
                    return;
                };
                match self.pending().remove(&request_id) {
                    Some(waiter) => {
                        let _ = waiter.send(reply);
                    }
                    None => tracing::debug!("Late {} for request {}", reply.kind(), request_id),
                }
            }
            other => tracing::debug!("Ignoring {} frame", other.kind()),
        }
    }

    async fn on_disconnect(&self) {
        self.pinger.pause();
        self.fail_pending();
        if let Err(e) = self.link(LinkEvent::Closed).await {
            tracing::debug!("Close after destroy: {}", e);
        }
        tracing::info!("Connection for channel {} closed", self.config.channel);
    }

    /// Feed a link event to the replica and dispatch the result.
    async fn link(&self, event: LinkEvent) -> Result<(), ReplicaError> {
        let notification = self.replica.write().await.on_link(event)?;
        self.emit(notification);
        Ok(())
    }

    fn emit(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            if let Notification::ReadyStateChange(state) = notification {
                tracing::debug!("Ready state of {} is now {}", self.config.channel, state);
                self.readiness.send_modify(|r| r.state = state);
            }
            self.dispatcher.dispatch(&notification);
        }
    }

    async fn send(&self, message: &Message) -> Result<(), ProviderError> {
        let bytes = message.to_bytes()?;
        self.transport.send(&bytes).await?;
        Ok(())
    }

    /// Send a request frame and wait for the reply carrying its id.
    async fn request(
        &self,
        build: impl FnOnce(RequestId) -> Message,
        timeout: Duration,
    ) -> Result<Message, ProviderError> {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        self.pending().insert(request_id, tx);

        if let Err(e) = self.send(&build(request_id)).await {
            self.pending().remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::ConnectionClosed.into()),
            Err(_) => {
                self.pending().remove(&request_id);
                Err(TransportError::Timeout.into())
            }
        }
    }

    async fn publish(&self, command: Command) -> Result<EventId, ProviderError> {
        let kind = command.kind();
        let bytes = command.to_bytes()?;
        let channel = self.config.channel.clone();
        let reply = self
            .request(
                |request_id| Message::Publish {
                    request_id,
                    channel,
                    command: bytes,
                },
                self.config.request_timeout,
            )
            .await?;

        match reply {
            Message::PublishAck { event_id, .. } => {
                tracing::debug!("{} accepted as event {}", kind.as_str(), event_id.value());
                Ok(event_id)
            }
            Message::PublishRejected { rejection, .. } => {
                tracing::warn!("{} rejected: {}", kind.as_str(), rejection);
                Err(ProviderError::Rejected(rejection))
            }
            other => Err(ProviderError::UnexpectedReply(other.kind())),
        }
    }

    async fn invoke(&self, name: &str, payload: f64, timeout: Duration) -> Result<f64, ProviderError> {
        let reply = self
            .request(
                |request_id| Message::Invoke {
                    request_id,
                    name: name.to_string(),
                    payload,
                },
                timeout,
            )
            .await?;

        match reply {
            Message::InvokeResult { payload, .. } => Ok(payload),
            Message::InvokeFailed { reason, .. } => Err(ProviderError::InvokeFailed(reason)),
            other => Err(ProviderError::UnexpectedReply(other.kind())),
        }
    }

    /// One ping round trip, recorded into the skew estimator.
    async fn sample(&self) -> Result<SkewSample, ProviderError> {
        let send_time = self.clock.now();
        let peer_time = self
            .invoke(PING_PROCEDURE, send_time, self.config.ping.timeout)
            .await?;
        let sample = SkewSample::new(send_time, peer_time, self.clock.now());
        if !sample.is_finite() {
            tracing::warn!("Discarding ping reply {} from relay", peer_time);
            return Err(ProviderError::InvalidPingReply(peer_time));
        }

        let notification = self.replica.write().await.record_sample(sample);
        tracing::debug!(
            "Ping latency {:.6}s, skew {:.6}s",
            sample.latency(),
            sample.skew()
        );
        self.emit(notification);
        Ok(sample)
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every waiting request with a closed-connection error.
    fn fail_pending(&self) {
        self.pending().clear();
    }
}

#[async_trait]
impl<T: Transport + 'static> PingTarget for Shared<T> {
    async fn ping(&self) {
        if let Err(e) = self.sample().await {
            tracing::warn!("Ping failed: {}", e);
        }
    }
}
