//! Transport abstraction for timing participants.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (TCP, in-memory, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `send()` transmits one encoded [`Message`](timing_types::Message) frame
//! - `recv()` receives one frame
//! - `close()` gracefully terminates
//!
//! Framing, request correlation and subscription handling live above this
//! layer in [`TimingProvider`](crate::TimingProvider). `send()` and `recv()`
//! must be callable concurrently: the provider keeps one task blocked in
//! `recv()` while other tasks send.
//!
//! # Example
//!
//! ```ignore
//! let transport = TcpTransport::new();
//! transport.connect("127.0.0.1:8000").await?;
//! transport.send(&frame_bytes).await?;
//! let reply = transport.recv().await?;
//! ```

mod mock;
mod tcp;

pub use mock::MockTransport;
pub use tcp::{TcpTransport, TcpTransportConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Operation timed out.
    #[error("operation timed out")]
    Timeout,
}

/// Transport trait for exchanging protocol frames with a relay.
///
/// Implementations handle the underlying connection mechanism
/// (TCP, in-process, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the relay at `address`.
    ///
    /// For TCP this is a `host:port` string. For testing, it's arbitrary.
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send one frame.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one frame.
    ///
    /// Waits until a frame is available or the connection closes.
    async fn recv(&self) -> Result<Vec<u8>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
