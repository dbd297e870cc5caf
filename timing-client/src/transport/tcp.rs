//! TcpTransport - length-prefixed frames over a TCP stream.
//!
//! Each frame is a 4-byte big-endian length followed by the encoded
//! message. The stream is split so one task can block in `recv()` while
//! others `send()`.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use timing_types::MAX_MESSAGE_SIZE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Configuration for TcpTransport.
#[derive(Clone, Debug)]
pub struct TcpTransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Largest frame accepted in either direction.
    pub max_message_size: usize,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// TcpTransport implements the Transport trait over a plain TCP stream.
///
/// # Example
///
/// ```ignore
/// let transport = TcpTransport::new();
/// transport.connect("127.0.0.1:8000").await?;
/// transport.send(&frame).await?;
/// let reply = transport.recv().await?;
/// ```
#[derive(Debug, Default)]
pub struct TcpTransport {
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    config: TcpTransportConfig,
}

impl TcpTransport {
    /// Create a new, unconnected TcpTransport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new TcpTransport with custom configuration.
    pub fn with_config(config: TcpTransportConfig) -> Self {
        Self {
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            config,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        // Close existing connection if any
        self.close().await.ok();

        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::ConnectionFailed(format!("{address}: {e}")))?;
        stream.set_nodelay(true).ok();

        let (read, write) = stream.into_split();
        *self.reader.lock().await = Some(read);
        *self.writer.lock().await = Some(write);

        tracing::debug!("Connected to {}", address);
        Ok(())
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        // Validate message size
        if data.len() > self.config.max_message_size {
            return Err(TransportError::SendFailed(format!(
                "Message too large: {} > {}",
                data.len(),
                self.config.max_message_size
            )));
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;

        // Length-prefixed framing (4 bytes, big-endian)
        let len = (data.len() as u32).to_be_bytes();
        writer
            .write_all(&len)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to write length: {e}")))?;
        writer
            .write_all(data)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to write data: {e}")))?;

        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(TransportError::NotConnected)?;

        // Read length prefix (4 bytes, big-endian)
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TransportError::ConnectionClosed
            } else {
                TransportError::ReceiveFailed(format!("Failed to read length: {e}"))
            }
        })?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > self.config.max_message_size {
            return Err(TransportError::ReceiveFailed(format!(
                "Message too large: {} > {}",
                len, self.config.max_message_size
            )));
        }

        let mut data = vec![0u8; len];
        reader
            .read_exact(&mut data)
            .await
            .map_err(|e| TransportError::ReceiveFailed(format!("Failed to read data: {e}")))?;

        Ok(data)
    }

    fn is_connected(&self) -> bool {
        self.writer
            .try_lock()
            .map(|guard| guard.is_some())
            .unwrap_or(true)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.shutdown().await.ok();
        }
        // A reader blocked in recv() holds its lock until the peer closes.
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        Ok(())
    }
}
