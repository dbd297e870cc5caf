//! Per-connection session management.
//!
//! A [`Session`] holds one participant's subscriptions and turns inbound
//! frames into broker calls. Everything it sends (replies and forwarded
//! channel events) goes through a single outbound queue, so a connection
//! sees a channel's `subscribed` frame before any of that channel's events.
//!
//! [`run`] drives a session over a length-prefixed TCP stream.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use timing_types::{ChannelEvent, ChannelId, Credential, Message};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::broker::{Broker, RelayMetrics};
use crate::config::LimitsConfig;
use crate::error::{ProtocolError, ProtocolResult};

struct Subscription {
    credential: Credential,
    forwarder: JoinHandle<()>,
}

/// A participant's view of the broker.
pub struct Session {
    broker: Arc<Broker>,
    outbound: mpsc::Sender<Message>,
    subscriptions: HashMap<ChannelId, Subscription>,
    ever_subscribed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("channels", &self.subscriptions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session with no subscriptions, sending its frames to `outbound`.
    pub fn new(broker: Arc<Broker>, outbound: mpsc::Sender<Message>) -> Self {
        broker.metrics().sessions_active.fetch_add(1, Ordering::Relaxed);
        Self {
            broker,
            outbound,
            subscriptions: HashMap::new(),
            ever_subscribed: false,
        }
    }

    /// Whether the session currently follows `channel`.
    pub fn is_subscribed(&self, channel: &ChannelId) -> bool {
        self.subscriptions.contains_key(channel)
    }

    /// Whether any subscription was ever granted on this session.
    pub fn has_subscribed(&self) -> bool {
        self.ever_subscribed
    }

    /// Handle one inbound frame.
    ///
    /// Rejections are answered on the outbound queue and are not errors.
    /// Frames only the relay sends are refused with
    /// [`ProtocolError::UnexpectedMessage`]; the session stays usable.
    pub async fn handle(&mut self, message: Message) -> ProtocolResult<()> {
        match message {
            Message::Subscribe {
                channel,
                credential,
            } => self.handle_subscribe(channel, credential).await,
            Message::Unsubscribe { channel } => {
                if let Some(subscription) = self.subscriptions.remove(&channel) {
                    subscription.forwarder.abort();
                    tracing::debug!("Unsubscribed from {}", channel);
                }
                Ok(())
            }
            Message::Publish {
                request_id,
                channel,
                command,
            } => {
                let subscription = self.subscriptions.get(&channel).map(|s| &s.credential);
                let reply = match self.broker.publish(&channel, &command, subscription) {
                    Ok(event_id) => Message::PublishAck {
                        request_id,
                        event_id,
                    },
                    Err(rejection) => Message::PublishRejected {
                        request_id,
                        rejection,
                    },
                };
                self.send(reply).await
            }
            Message::Invoke {
                request_id,
                name,
                payload,
            } => {
                let reply = match self.broker.invoke(&name, payload) {
                    Ok(payload) => Message::InvokeResult {
                        request_id,
                        payload,
                    },
                    Err(reason) => Message::InvokeFailed { request_id, reason },
                };
                self.send(reply).await
            }
            other => Err(ProtocolError::UnexpectedMessage {
                actual: other.kind(),
            }),
        }
    }

    async fn handle_subscribe(
        &mut self,
        channel: ChannelId,
        credential: Credential,
    ) -> ProtocolResult<()> {
        let feed = match self.broker.subscribe(&channel, &credential) {
            Ok(feed) => feed,
            Err(rejection) => {
                return self
                    .send(Message::SubscribeFailed { channel, rejection })
                    .await;
            }
        };

        // Resubscribing replaces the old stream.
        if let Some(previous) = self.subscriptions.remove(&channel) {
            previous.forwarder.abort();
        }

        self.send(Message::Subscribed {
            channel: channel.clone(),
            snapshot: feed.snapshot,
        })
        .await?;

        let forwarder = tokio::spawn(forward(
            Arc::clone(&self.broker),
            channel.clone(),
            feed.events,
            self.outbound.clone(),
        ));
        self.subscriptions.insert(
            channel,
            Subscription {
                credential,
                forwarder,
            },
        );
        self.ever_subscribed = true;
        Ok(())
    }

    async fn send(&self, message: Message) -> ProtocolResult<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| ProtocolError::Stream("outbound queue closed".into()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for (_, subscription) in self.subscriptions.drain() {
            subscription.forwarder.abort();
        }
        self.broker
            .metrics()
            .sessions_active
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Copy channel events onto the outbound queue.
///
/// A subscriber that lags past the broadcast buffer gets a fresh snapshot
/// as a `subscribed` frame; its replica discards the stale events that
/// follow.
async fn forward(
    broker: Arc<Broker>,
    channel: ChannelId,
    mut events: broadcast::Receiver<ChannelEvent>,
    outbound: mpsc::Sender<Message>,
) {
    loop {
        let message = match events.recv().await {
            Ok(event) => Message::Event {
                channel: channel.clone(),
                event,
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(
                    "Subscriber to {} lagged by {} events, resending snapshot",
                    channel,
                    skipped
                );
                Message::Subscribed {
                    channel: channel.clone(),
                    snapshot: broker.snapshot(&channel),
                }
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        if outbound.send(message).await.is_err() {
            return;
        }
    }
}

/// Serve one TCP connection until the peer hangs up or misbehaves.
///
/// A connection that has not been granted a subscription within
/// `subscribe_timeout_secs` is dropped. Frames above `max_message_size`
/// end the connection; frames that fail to decode are skipped.
pub async fn run(broker: Arc<Broker>, stream: TcpStream, limits: &LimitsConfig) -> ProtocolResult<()> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    tracing::info!("New connection from {}", peer);

    let (mut reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel(limits.event_buffer.max(1));
    let writer = tokio::spawn(write_loop(writer, rx));

    let mut session = Session::new(Arc::clone(&broker), tx);
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(limits.subscribe_timeout_secs);

    let result = loop {
        let frame = if session.has_subscribed() {
            read_frame(&mut reader, limits.max_message_size).await
        } else {
            match tokio::time::timeout_at(deadline, read_frame(&mut reader, limits.max_message_size))
                .await
            {
                Ok(frame) => frame,
                Err(_) => {
                    tracing::warn!(
                        "Subscribe timeout ({}s) for {}",
                        limits.subscribe_timeout_secs,
                        peer
                    );
                    break Err(ProtocolError::SubscribeTimeout {
                        secs: limits.subscribe_timeout_secs,
                    });
                }
            }
        };

        let bytes = match frame {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        let message = match Message::from_bytes(&bytes) {
            Ok(message) => message,
            Err(e) => {
                RelayMetrics::incr(&broker.metrics().errors_total);
                tracing::warn!("Undecodable frame from {}: {}", peer, e);
                continue;
            }
        };

        tracing::debug!("{} -> {}", peer, message.kind());
        match session.handle(message).await {
            Ok(()) => {}
            Err(e @ ProtocolError::UnexpectedMessage { .. }) => {
                RelayMetrics::incr(&broker.metrics().errors_total);
                tracing::warn!("Protocol error from {}: {}", peer, e);
            }
            Err(e) => break Err(e),
        }
    };

    if result.is_err() {
        RelayMetrics::incr(&broker.metrics().errors_total);
    }

    // Dropping the session closes the queue; the writer flushes and exits.
    drop(session);
    if let Err(e) = writer.await {
        tracing::debug!("Writer for {} ended abnormally: {}", peer, e);
    }
    tracing::info!("Connection from {} closed", peer);
    result
}

async fn write_loop(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Message>) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &message).await {
            tracing::debug!("Write failed: {}", e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

/// Read a length-prefixed frame. `Ok(None)` means the peer hung up cleanly.
async fn read_frame(reader: &mut OwnedReadHalf, max: usize) -> ProtocolResult<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(ProtocolError::Stream(e.to_string())),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > max {
        return Err(ProtocolError::InvalidMessage {
            reason: format!("message too large: {} > {}", len, max),
        });
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| ProtocolError::Stream(e.to_string()))?;
    Ok(Some(buf))
}

/// Write a length-prefixed frame.
async fn write_frame(writer: &mut OwnedWriteHalf, message: &Message) -> ProtocolResult<()> {
    let bytes = message.to_bytes()?;
    let len = bytes.len() as u32;
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| ProtocolError::Stream(e.to_string()))?;
    writer
        .write_all(&bytes)
        .await
        .map_err(|e| ProtocolError::Stream(e.to_string()))?;
    Ok(())
}
