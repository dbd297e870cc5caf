//! In-process transport to a relay broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use timing_client::{Transport, TransportError};
use timing_relay::{Broker, Session};
use timing_types::Message;
use tokio::sync::{mpsc, Mutex};

/// Frames buffered toward the participant before the session waits.
const OUTBOUND_CAPACITY: usize = 256;

/// A [`Transport`] that hands frames to a relay [`Session`] in memory.
///
/// The connect address is ignored; every connection reaches the broker the
/// transport was built with. Clones share one connection, so a test can
/// keep a handle after giving the transport to a provider.
#[derive(Clone)]
pub struct LocalTransport {
    inner: Arc<Inner>,
}

struct Inner {
    broker: Arc<Broker>,
    session: Mutex<Option<Session>>,
    inbound: Mutex<Option<mpsc::Receiver<Message>>>,
    connected: AtomicBool,
}

impl LocalTransport {
    /// A disconnected transport to `broker`.
    pub fn new(broker: Arc<Broker>) -> Self {
        Self {
            inner: Arc::new(Inner {
                broker,
                session: Mutex::new(None),
                inbound: Mutex::new(None),
                connected: AtomicBool::new(false),
            }),
        }
    }

    /// Drop the relay side of the connection, as if the relay went away.
    pub async fn sever(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.session.lock().await.take();
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn connect(&self, _address: &str) -> Result<(), TransportError> {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        *self.inner.session.lock().await = Some(Session::new(Arc::clone(&self.inner.broker), tx));
        *self.inner.inbound.lock().await = Some(rx);
        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let message =
            Message::from_bytes(data).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        let mut session = self.inner.session.lock().await;
        let session = session.as_mut().ok_or(TransportError::NotConnected)?;
        session
            .handle(message)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut inbound = self.inner.inbound.lock().await;
        let rx = inbound.as_mut().ok_or(TransportError::NotConnected)?;
        match rx.recv().await {
            Some(message) => message
                .to_bytes()
                .map_err(|e| TransportError::ReceiveFailed(e.to_string())),
            None => Err(TransportError::ConnectionClosed),
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sever().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timing_core::ManualClock;
    use timing_types::{ChannelId, Credential};

    fn broker() -> Arc<Broker> {
        Arc::new(Broker::new(Arc::new(ManualClock::new(0.0)), 16))
    }

    #[tokio::test]
    async fn frames_reach_the_session() {
        let broker = broker();
        let transport = LocalTransport::new(Arc::clone(&broker));
        transport.connect("anywhere").await.unwrap();

        let subscribe = Message::Subscribe {
            channel: ChannelId::new("room"),
            credential: Credential::for_channel(ChannelId::new("room")),
        };
        transport.send(&subscribe.to_bytes().unwrap()).await.unwrap();

        let reply = Message::from_bytes(&transport.recv().await.unwrap()).unwrap();
        assert!(matches!(reply, Message::Subscribed { .. }));
        assert_eq!(broker.store().subscriber_count(), 1);
    }

    #[tokio::test]
    async fn sever_ends_the_stream() {
        let transport = LocalTransport::new(broker());
        transport.connect("anywhere").await.unwrap();

        transport.sever().await;
        assert!(!transport.is_connected());
        assert_eq!(transport.recv().await, Err(TransportError::ConnectionClosed));
        assert!(matches!(
            transport.send(&Message::Unsubscribe { channel: "room".into() }.to_bytes().unwrap()).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn undecodable_frame_fails_send() {
        let transport = LocalTransport::new(broker());
        transport.connect("anywhere").await.unwrap();

        assert!(matches!(
            transport.send(&[0xc1]).await,
            Err(TransportError::SendFailed(_))
        ));
    }
}
