//! Clock skew estimation against the relay clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use timing_client::{handler, ProviderConfig, ProviderError, TimingProvider, TransportError};
use timing_core::{ManualClock, Notification, NotificationKind, ReadyState};
use timing_e2e_tests::TestRelay;

#[tokio::test]
async fn ping_measures_offset_to_relay_clock() {
    let relay = TestRelay::new(1000.0);
    let local = ManualClock::new(10.0);
    let provider = relay.join("room", &local).await;

    let sample = provider.ping().await.unwrap();
    assert_eq!(sample.peer_time, 1000.0);
    assert_eq!(sample.skew(), 990.0);
    assert_eq!(provider.skew().await, Some(990.0));
    assert_eq!(provider.server_time().await, 1000.0);
}

#[tokio::test]
async fn skew_change_is_notified_once() {
    let relay = TestRelay::new(50.0);
    let local = ManualClock::new(20.0);
    let provider = relay.provider(ProviderConfig::new("room", "local"), &local);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    provider.on(
        NotificationKind::SkewChange,
        handler(move |n| {
            if let Notification::SkewChange(skew) = n {
                sink.lock().unwrap().push(*skew);
            }
            Ok(())
        }),
    );

    provider.connect().await.unwrap();
    provider.wait_open(Duration::from_secs(2)).await.unwrap();
    // Background pings and explicit ones all see the same offset.
    for _ in 0..3 {
        provider.ping().await.unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), vec![30.0]);
}

#[tokio::test]
async fn severed_relay_closes_replica() {
    let relay = TestRelay::new(0.0);
    let local = ManualClock::new(0.0);
    let transport = relay.transport();
    let link = transport.clone();
    let provider = TimingProvider::with_clock(
        ProviderConfig::new("room", "local"),
        transport,
        Arc::new(local.clone()),
    );
    provider.connect().await.unwrap();
    provider.wait_open(Duration::from_secs(2)).await.unwrap();

    link.sever().await;
    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        while provider.ready_state().await != ReadyState::Closed {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(closed.is_ok());

    // Pings fail without disturbing the closed replica.
    assert!(matches!(
        provider.ping().await,
        Err(ProviderError::Transport(TransportError::NotConnected))
    ));
    assert!(matches!(provider.connect().await, Err(ProviderError::Closed)));
    assert_eq!(relay.broker().store().subscriber_count(), 0);
}
