//! Authorization is surfaced as rejections, never as channel data.

use std::time::Duration;

use timing_client::{ProviderConfig, ProviderError, Transport};
use timing_core::{ManualClock, ReadyState};
use timing_e2e_tests::TestRelay;
use timing_types::{ChannelId, Command, Credential, Message, MotionVector, Rejection};

#[tokio::test]
async fn foreign_credential_cannot_subscribe() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let config = ProviderConfig::new("room", "local")
        .with_credential(Credential::for_channel(ChannelId::new("lobby")));
    let provider = relay.provider(config, &clock);

    provider.connect().await.unwrap();
    let result = provider.wait_open(Duration::from_secs(2)).await;

    assert!(matches!(
        result,
        Err(ProviderError::Rejected(Rejection::NotAuthorized { .. }))
    ));
    assert_eq!(provider.ready_state().await, ReadyState::Connecting);
    assert_eq!(relay.broker().store().subscriber_count(), 0);
}

#[tokio::test]
async fn publish_without_subscription_is_refused() {
    let relay = TestRelay::new(0.0);
    let transport = relay.transport();
    transport.connect("local").await.unwrap();

    let publish = Message::Publish {
        request_id: 1,
        channel: ChannelId::new("room"),
        command: Command::Update(MotionVector::at_rest(0.0)).to_bytes().unwrap(),
    };
    transport.send(&publish.to_bytes().unwrap()).await.unwrap();

    let reply = Message::from_bytes(&transport.recv().await.unwrap()).unwrap();
    assert!(matches!(
        reply,
        Message::PublishRejected {
            request_id: 1,
            rejection: Rejection::NotAuthorized { .. }
        }
    ));
    assert_eq!(
        relay.broker().snapshot(&ChannelId::new("room")).event_id.value(),
        0
    );
}

#[tokio::test]
async fn subscription_to_one_channel_does_not_cover_another() {
    let relay = TestRelay::new(0.0);
    let transport = relay.transport();
    transport.connect("local").await.unwrap();

    let subscribe = Message::Subscribe {
        channel: ChannelId::new("room"),
        credential: Credential::for_channel(ChannelId::new("room")),
    };
    transport.send(&subscribe.to_bytes().unwrap()).await.unwrap();
    transport.recv().await.unwrap();

    let publish = Message::Publish {
        request_id: 2,
        channel: ChannelId::new("lobby"),
        command: Command::Update(MotionVector::at_rest(0.0)).to_bytes().unwrap(),
    };
    transport.send(&publish.to_bytes().unwrap()).await.unwrap();

    let reply = Message::from_bytes(&transport.recv().await.unwrap()).unwrap();
    assert!(matches!(
        reply,
        Message::PublishRejected {
            rejection: Rejection::NotAuthorized { .. },
            ..
        }
    ));
}
