//! CLI command implementations.

pub mod ping;
pub mod range;
pub mod update;
pub mod watch;

use std::time::Duration;

use anyhow::{Context, Result};
use timing_client::{ProviderConfig, TcpTransport, TimingProvider};
use timing_types::Credential;

/// Where to connect and which channel to join.
#[derive(Debug, Clone)]
pub struct Target {
    pub relay: String,
    pub channel: String,
    pub subject: Option<String>,
    pub open_timeout: Duration,
}

impl Target {
    fn config(&self) -> ProviderConfig {
        let config = ProviderConfig::new(self.channel.as_str(), &self.relay);
        match &self.subject {
            Some(subject) => {
                let credential =
                    Credential::for_channel(config.channel.clone()).with_subject(subject.as_str());
                config.with_credential(credential)
            }
            None => config,
        }
    }
}

/// Connect to the relay and wait for the channel snapshot.
pub async fn open(target: &Target) -> Result<TimingProvider<TcpTransport>> {
    let provider = TimingProvider::new(target.config(), TcpTransport::new());
    provider
        .connect()
        .await
        .with_context(|| format!("Failed to connect to relay at {}", target.relay))?;
    provider
        .wait_open(target.open_timeout)
        .await
        .with_context(|| format!("Channel {} did not open", target.channel))?;
    Ok(provider)
}

/// Leave the channel, logging rather than failing on a dirty close.
pub async fn close(provider: TimingProvider<TcpTransport>) {
    if let Err(e) = provider.destroy().await {
        tracing::debug!("Close failed: {}", e);
    }
}
