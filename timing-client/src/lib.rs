//! # timing-client
//!
//! Participant library for shared timing objects.
//!
//! Applications use this crate to follow a channel's motion vector and to
//! propose changes to it.
//!
//! ## Features
//!
//! - **Replica**: ordered application of the relay's broadcasts, with
//!   extrapolation to a skew-corrected clock
//! - **Skew Estimation**: adaptive ping schedule feeding a minimum-latency
//!   estimator
//! - **Notifications**: vector, skew and ready-state handlers with
//!   per-handler failure isolation
//! - **Transport Abstraction**: Pluggable transport layer (TCP, mock)
//! - **Pure State Machine**: Uses timing-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use timing_client::{ProviderConfig, TcpTransport, TimingProvider};
//!
//! let provider = TimingProvider::new(
//!     ProviderConfig::new("room", "127.0.0.1:8000"),
//!     TcpTransport::new(),
//! );
//! provider.connect().await?;
//! provider.wait_open(Duration::from_secs(5)).await?;
//!
//! let now = provider.current_vector().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod events;
pub mod pinger;
pub mod provider;
pub mod transport;

pub use config::{PingConfig, ProviderConfig};
pub use events::{handler, EventDispatcher, Handler, HandlerResult, NotificationHandler};
pub use pinger::{PingTarget, Pinger};
pub use provider::{ProviderError, TimingProvider};
pub use transport::{MockTransport, TcpTransport, TcpTransportConfig, Transport, TransportError};
