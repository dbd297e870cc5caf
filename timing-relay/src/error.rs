//! Error types for timing-relay.

/// Main error type for timing-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Protocol layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Invalid message format.
    #[error("invalid message format: {reason}")]
    InvalidMessage {
        /// Reason the message is invalid.
        reason: String,
    },

    /// Frame encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] timing_types::TimingError),

    /// A frame only the relay sends arrived from a participant.
    #[error("unexpected message type: {actual}")]
    UnexpectedMessage {
        /// Kind of the frame received.
        actual: &'static str,
    },

    /// No subscription arrived in time.
    #[error("no subscription within {secs}s")]
    SubscribeTimeout {
        /// The configured timeout.
        secs: u64,
    },

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
