//! Configuration for [`TimingProvider`](crate::TimingProvider).

use std::time::Duration;

use timing_core::{DEFAULT_STEADY_INTERVAL, DEFAULT_WINDOW};
use timing_types::{ChannelId, Credential};

/// Ping scheduling and skew estimation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PingConfig {
    /// Interval between pings once calibrated (default: 1 s).
    pub steady_interval: Duration,
    /// Per-ping timeout (default: 2 s).
    pub timeout: Duration,
    /// Number of samples the skew estimator keeps (default: 30).
    pub window: usize,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            steady_interval: DEFAULT_STEADY_INTERVAL,
            timeout: Duration::from_secs(2),
            window: DEFAULT_WINDOW,
        }
    }
}

impl PingConfig {
    /// Set the steady-state interval.
    pub fn with_steady_interval(mut self, interval: Duration) -> Self {
        self.steady_interval = interval;
        self
    }

    /// Set the per-ping timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sample window capacity.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

/// Configuration for a timing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Channel to replicate.
    pub channel: ChannelId,
    /// Claims presented on subscribe.
    pub credential: Credential,
    /// Address of the relay (`host:port` for TCP).
    pub relay_address: String,
    /// How long to wait for a publish acknowledgement (default: 5 s).
    pub request_timeout: Duration,
    /// Ping settings.
    pub ping: PingConfig,
}

impl ProviderConfig {
    /// Configuration for `channel` at `relay_address`, with a credential
    /// scoped to that channel.
    pub fn new(channel: impl Into<String>, relay_address: &str) -> Self {
        let channel = ChannelId::new(channel);
        Self {
            credential: Credential::for_channel(channel.clone()),
            channel,
            relay_address: relay_address.to_string(),
            request_timeout: Duration::from_secs(5),
            ping: PingConfig::default(),
        }
    }

    /// Present a different credential.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Set the publish acknowledgement timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the ping settings.
    pub fn with_ping(mut self, ping: PingConfig) -> Self {
        self.ping = ping;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ProviderConfig::new("room", "127.0.0.1:8000");
        assert_eq!(config.channel.as_str(), "room");
        assert!(config.credential.grants(&config.channel));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.ping.steady_interval, Duration::from_secs(1));
        assert_eq!(config.ping.timeout, Duration::from_secs(2));
        assert_eq!(config.ping.window, 30);
    }

    #[test]
    fn builders_override() {
        let config = ProviderConfig::new("room", "relay:1")
            .with_credential(Credential::for_channel("other".into()))
            .with_request_timeout(Duration::from_millis(250))
            .with_ping(
                PingConfig::default()
                    .with_steady_interval(Duration::from_secs(10))
                    .with_timeout(Duration::from_millis(500))
                    .with_window(5),
            );

        assert!(!config.credential.grants(&config.channel));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.ping.steady_interval, Duration::from_secs(10));
        assert_eq!(config.ping.timeout, Duration::from_millis(500));
        assert_eq!(config.ping.window, 5);
    }
}
