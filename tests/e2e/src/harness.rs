//! Test relay and helpers.

use std::sync::Arc;
use std::time::Duration;

use timing_client::{ProviderConfig, TimingProvider, Transport};
use timing_core::ManualClock;
use timing_relay::Broker;
use timing_types::EventId;

use crate::transport::LocalTransport;

/// How long helpers wait for asynchronous delivery before giving up.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// An in-process relay with a hand-driven clock.
pub struct TestRelay {
    broker: Arc<Broker>,
    clock: ManualClock,
}

impl TestRelay {
    /// A relay whose clock reads `start` seconds.
    pub fn new(start: f64) -> Self {
        let clock = ManualClock::new(start);
        Self {
            broker: Arc::new(Broker::new(Arc::new(clock.clone()), 1024)),
            clock,
        }
    }

    /// The relay clock.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// The broker behind the relay.
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// A fresh, unconnected transport to this relay.
    pub fn transport(&self) -> LocalTransport {
        LocalTransport::new(Arc::clone(&self.broker))
    }

    /// An unconnected provider reading local time from `local`.
    pub fn provider(
        &self,
        config: ProviderConfig,
        local: &ManualClock,
    ) -> TimingProvider<LocalTransport> {
        TimingProvider::with_clock(config, self.transport(), Arc::new(local.clone()))
    }

    /// A provider on `channel` that has connected and opened.
    ///
    /// # Panics
    ///
    /// Panics if the channel does not open.
    pub async fn join(&self, channel: &str, local: &ManualClock) -> TimingProvider<LocalTransport> {
        let provider = self.provider(ProviderConfig::new(channel, "local"), local);
        provider.connect().await.expect("connect");
        provider.wait_open(SETTLE_TIMEOUT).await.expect("open");
        provider
    }
}

/// Wait until `provider` has applied `event_id` (or something newer).
///
/// # Panics
///
/// Panics if that does not happen within [`SETTLE_TIMEOUT`].
pub async fn settle<T: Transport + 'static>(provider: &TimingProvider<T>, event_id: EventId) {
    let reached = tokio::time::timeout(SETTLE_TIMEOUT, async {
        loop {
            if provider.last_event_id().await.is_some_and(|id| id >= event_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "replica of {} never reached event {}",
        provider.channel(),
        event_id
    );
}
