//! Replicas following one channel through an in-process relay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use timing_client::{handler, ProviderError};
use timing_core::{ManualClock, NotificationKind, ReadyState, ReplicaError};
use timing_e2e_tests::{settle, TestRelay};
use timing_types::{EventId, MotionVector, PartialVector, Range};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ===========================================
// Extrapolation
// ===========================================

#[tokio::test]
async fn update_from_one_replica_extrapolates_on_another() {
    let relay = TestRelay::new(100.0);
    let clock_a = ManualClock::new(100.0);
    let clock_b = ManualClock::new(40.0);

    let a = relay.join("room", &clock_a).await;
    let b = relay.join("room", &clock_b).await;

    // Fresh channel: at rest at the relay's creation time, unbounded.
    assert_eq!(b.vector().await, Some(MotionVector::at_rest(100.0)));
    assert_eq!(b.range().await, Range::unbounded());

    let event_id = a
        .update(PartialVector::new().position(5.0).velocity(1.0))
        .await
        .unwrap();
    assert_eq!(event_id, EventId::new(1));
    settle(&b, event_id).await;

    let at_t0_plus_2 = b.vector_at(102.0).await.unwrap();
    assert!(approx(at_t0_plus_2.position, 7.0));
    assert!(approx(at_t0_plus_2.velocity, 1.0));
    assert!(approx(at_t0_plus_2.acceleration, 0.0));

    // Through B's own clock once skew is known: 42 local + 60 skew = 102.
    b.ping().await.unwrap();
    assert_eq!(b.skew().await, Some(60.0));
    relay.clock().set(102.0);
    clock_b.set(42.0);
    let current = b.current_vector().await.unwrap();
    assert!(approx(current.position, 7.0));
}

#[tokio::test]
async fn relay_stamps_updates_with_its_own_clock() {
    let relay = TestRelay::new(500.0);
    let local = ManualClock::new(3.0);
    let a = relay.join("room", &local).await;

    let event_id = a.update(PartialVector::new().velocity(2.0)).await.unwrap();
    settle(&a, event_id).await;

    assert_eq!(a.vector().await.unwrap().timestamp, 500.0);
}

// ===========================================
// Range
// ===========================================

#[tokio::test]
async fn set_range_checks_the_current_vector() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let a = relay.join("room", &clock).await;
    let b = relay.join("room", &clock).await;

    a.update(PartialVector::new().position(5.0)).await.unwrap();
    a.set_range(Range::new(0.0, 10.0).unwrap()).await.unwrap();

    let accepted = a.set_range(Range::new(0.0, 5.0).unwrap()).await.unwrap();
    let refused = a.set_range(Range::new(6.0, 10.0).unwrap()).await;
    assert!(matches!(
        refused,
        Err(ProviderError::Rejected(timing_types::Rejection::RangeViolation { .. }))
    ));

    settle(&b, accepted).await;
    assert_eq!(b.range().await, Range::new(0.0, 5.0).unwrap());
    assert_eq!(b.start_position().await, 0.0);
    assert_eq!(b.end_position().await, 5.0);
    assert_eq!(relay.broker().snapshot(&"room".into()).event_id, accepted);
}

#[tokio::test]
async fn update_past_the_boundary_is_rejected_everywhere() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let a = relay.join("room", &clock).await;
    let b = relay.join("room", &clock).await;

    let last = a.set_range(Range::new(-1.0, 1.0).unwrap()).await.unwrap();
    let result = a.update(PartialVector::new().position(1.0).velocity(0.5)).await;
    assert!(matches!(result, Err(ProviderError::Rejected(_))));

    settle(&b, last).await;
    assert_eq!(b.last_event_id().await, Some(last));
    assert_eq!(b.vector().await.unwrap().position, 0.0);
}

// ===========================================
// Convergence
// ===========================================

#[tokio::test]
async fn concurrent_writers_converge() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let replicas = [
        Arc::new(relay.join("room", &clock).await),
        Arc::new(relay.join("room", &clock).await),
        Arc::new(relay.join("room", &clock).await),
    ];

    let writers: Vec<_> = replicas
        .iter()
        .enumerate()
        .map(|(i, replica)| {
            let replica = Arc::clone(replica);
            tokio::spawn(async move {
                for j in 0..10 {
                    replica
                        .update(PartialVector::new().position((i * 10 + j) as f64))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let authoritative = relay.broker().snapshot(&"room".into());
    assert_eq!(authoritative.event_id, EventId::new(30));
    for replica in &replicas {
        settle(replica, authoritative.event_id).await;
        assert_eq!(replica.vector().await, Some(authoritative.vector));
    }
}

#[tokio::test]
async fn late_joiner_starts_from_snapshot() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let a = relay.join("room", &clock).await;
    a.update(PartialVector::new().velocity(3.0)).await.unwrap();
    a.update(PartialVector::new().acceleration(1.0)).await.unwrap();

    let late = relay.join("room", &clock).await;
    assert_eq!(late.last_event_id().await, Some(EventId::new(2)));
    assert_eq!(late.vector().await.unwrap().acceleration, 1.0);
}

#[tokio::test]
async fn channels_do_not_leak_into_each_other() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let room = relay.join("room", &clock).await;
    let lobby = relay.join("lobby", &clock).await;

    let event_id = room.update(PartialVector::new().position(9.0)).await.unwrap();
    settle(&room, event_id).await;

    assert_eq!(lobby.last_event_id().await, Some(EventId::zero()));
    assert_eq!(lobby.vector().await.unwrap().position, 0.0);
}

// ===========================================
// Notifications & Lifecycle
// ===========================================

#[tokio::test]
async fn vector_change_handlers_fire_once_per_event() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let a = relay.join("room", &clock).await;
    let b = relay.join("room", &clock).await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let on_change = handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert!(b.on(NotificationKind::VectorChange, on_change.clone()));
    assert!(!b.on(NotificationKind::VectorChange, on_change.clone()));

    a.update(PartialVector::new().position(1.0)).await.unwrap();
    let last = a.update(PartialVector::new().position(2.0)).await.unwrap();
    settle(&b, last).await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    assert!(b.off(NotificationKind::VectorChange, &on_change));
    let last = a.update(PartialVector::new().position(3.0)).await.unwrap();
    settle(&b, last).await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn destroy_releases_subscription() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let a = relay.join("room", &clock).await;
    assert_eq!(relay.broker().store().subscriber_count(), 1);

    a.destroy().await.unwrap();
    assert_eq!(a.ready_state().await, ReadyState::Closed);
    assert!(matches!(
        a.destroy().await,
        Err(ProviderError::Replica(ReplicaError::AlreadyDestroyed))
    ));
    assert!(matches!(
        a.update(PartialVector::new().position(1.0)).await,
        Err(ProviderError::Replica(ReplicaError::NotOpen))
    ));

    for _ in 0..100 {
        if relay.broker().store().subscriber_count() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(relay.broker().store().subscriber_count(), 0);
}

#[tokio::test]
async fn reconnect_reopens_on_unchanged_channel() {
    let relay = TestRelay::new(0.0);
    let clock = ManualClock::new(0.0);
    let a = relay.join("room", &clock).await;

    a.connect().await.unwrap();
    a.wait_open(std::time::Duration::from_secs(2)).await.unwrap();
    assert_eq!(a.ready_state().await, ReadyState::Open);
    assert_eq!(a.last_event_id().await, Some(EventId::zero()));

    let event_id = a.update(PartialVector::new().position(4.0)).await.unwrap();
    settle(&a, event_id).await;
    assert_eq!(a.vector().await.unwrap().position, 4.0);
    assert_eq!(relay.broker().store().subscriber_count(), 1);
}
