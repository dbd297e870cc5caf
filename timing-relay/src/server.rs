//! Main TimingRelay server coordination.
//!
//! TimingRelay owns the broker and accepts connections, handing each to
//! its own session task.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use timing_core::{Clock, MonotonicClock};
use tokio::net::TcpListener;

use crate::broker::{Broker, RelayMetrics};
use crate::config::Config;
use crate::session;

/// Main relay server.
#[derive(Debug)]
pub struct TimingRelay {
    config: Config,
    broker: Arc<Broker>,
}

impl TimingRelay {
    /// Create a relay whose authoritative clock starts at 0 now.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Create a relay reading authoritative time from `clock`.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let broker = Broker::new(clock, config.limits.event_buffer);
        Self::with_broker(config, Arc::new(broker))
    }

    /// Create a relay around an existing broker.
    pub fn with_broker(config: Config, broker: Arc<Broker>) -> Self {
        Self { config, broker }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the broker.
    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        self.broker.metrics()
    }

    /// Sessions currently open.
    pub fn total_sessions(&self) -> u64 {
        self.metrics().sessions_active.load(Ordering::Relaxed)
    }

    /// Channels created so far.
    pub fn total_channels(&self) -> usize {
        self.broker.store().len()
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        tracing::info!("Listening on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await?;
            RelayMetrics::incr(&self.metrics().connections_total);

            let relay = Arc::clone(&self);
            // Spawn session handler - don't block the accept loop
            tokio::spawn(async move {
                let broker = Arc::clone(&relay.broker);
                if let Err(e) = session::run(broker, stream, &relay.config.limits).await {
                    tracing::warn!("Session error for {}: {}", peer, e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timing_core::ManualClock;
    use timing_types::{ChannelId, Credential, Message};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start() -> (Arc<TimingRelay>, std::net::SocketAddr) {
        let relay = Arc::new(TimingRelay::with_clock(
            Config::default(),
            Arc::new(ManualClock::new(0.0)),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(Arc::clone(&relay).serve(listener));
        (relay, addr)
    }

    async fn subscribe(addr: std::net::SocketAddr, channel: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let bytes = Message::Subscribe {
            channel: ChannelId::new(channel),
            credential: Credential::for_channel(ChannelId::new(channel)),
        }
        .to_bytes()
        .unwrap();
        stream.write_all(&(bytes.len() as u32).to_be_bytes()).await.unwrap();
        stream.write_all(&bytes).await.unwrap();

        let mut len = [0u8; 4];
        stream.read_exact(&mut len).await.unwrap();
        let mut buf = vec![0u8; u32::from_be_bytes(len) as usize];
        stream.read_exact(&mut buf).await.unwrap();
        assert!(matches!(
            Message::from_bytes(&buf).unwrap(),
            Message::Subscribed { .. }
        ));
        stream
    }

    #[tokio::test]
    async fn accepts_concurrent_connections() {
        let (relay, addr) = start().await;

        let _a = subscribe(addr, "room").await;
        let _b = subscribe(addr, "room").await;
        let _c = subscribe(addr, "lobby").await;

        assert_eq!(relay.metrics().connections_total.load(Ordering::Relaxed), 3);
        assert_eq!(relay.total_sessions(), 3);
        assert_eq!(relay.total_channels(), 2);
        assert_eq!(relay.broker().store().subscriber_count(), 3);
    }

    #[tokio::test]
    async fn session_released_on_disconnect() {
        let (relay, addr) = start().await;
        let stream = subscribe(addr, "room").await;
        drop(stream);

        for _ in 0..100 {
            if relay.total_sessions() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(relay.total_sessions(), 0);
    }
}
