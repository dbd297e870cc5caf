//! Per-channel authorization hooks.

use timing_types::{ChannelId, Credential, Rejection};

/// Decides who may subscribe to and publish on a channel.
///
/// Failures surface to the requester as [`Rejection::NotAuthorized`],
/// never as channel data.
pub trait Authorizer: Send + Sync + std::fmt::Debug {
    /// May the bearer of `credential` subscribe to `channel`?
    fn authorize_subscribe(&self, channel: &ChannelId, credential: &Credential)
        -> Result<(), Rejection>;

    /// May a session publish on `channel`?
    ///
    /// `subscription` is the credential of the session's live subscription
    /// to that channel, if it has one.
    fn authorize_publish(
        &self,
        channel: &ChannelId,
        subscription: Option<&Credential>,
    ) -> Result<(), Rejection>;
}

/// Default policy: a credential grants exactly the channel it is scoped to,
/// and publishing requires a live subscription.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelScoped;

impl Authorizer for ChannelScoped {
    fn authorize_subscribe(
        &self,
        channel: &ChannelId,
        credential: &Credential,
    ) -> Result<(), Rejection> {
        if credential.grants(channel) {
            Ok(())
        } else {
            Err(Rejection::NotAuthorized {
                reason: format!(
                    "credential scoped to {} cannot join {}",
                    credential.channel, channel
                ),
            })
        }
    }

    fn authorize_publish(
        &self,
        channel: &ChannelId,
        subscription: Option<&Credential>,
    ) -> Result<(), Rejection> {
        match subscription {
            Some(credential) if credential.grants(channel) => Ok(()),
            Some(_) => Err(Rejection::NotAuthorized {
                reason: format!("subscription does not cover {}", channel),
            }),
            None => Err(Rejection::NotAuthorized {
                reason: format!("not subscribed to {}", channel),
            }),
        }
    }
}
