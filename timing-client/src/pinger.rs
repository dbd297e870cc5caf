//! Adaptive ping timer.
//!
//! The [`Pinger`] owns at most one running timer task. Each tick spawns a
//! ping on the [`PingTarget`] and sleeps for the delay [`PingCadence`]
//! prescribes, so a slow or failed round trip never delays the schedule.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use timing_core::PingCadence;
use tokio::task::JoinHandle;

/// Something that can run one ping round trip.
///
/// Implementations report their own failures; the timer only schedules.
#[async_trait]
pub trait PingTarget: Send + Sync + 'static {
    /// Run one round trip.
    async fn ping(&self);
}

/// Owner of the ping timer's cancellation handle.
#[derive(Debug)]
pub struct Pinger {
    steady: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Pinger {
    /// A stopped pinger settling at `steady` between pings.
    pub fn new(steady: Duration) -> Self {
        Self {
            steady,
            timer: Mutex::new(None),
        }
    }

    /// Start pinging `target` from the fast phase.
    ///
    /// Any running timer is cancelled first, so calling this twice leaves
    /// exactly one timer.
    pub fn start(&self, target: Arc<dyn PingTarget>) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        *timer = Some(tokio::spawn(run(target, self.steady)));
        tracing::debug!("Ping timer armed (steady {:?})", self.steady);
    }

    /// Restart from the fast phase.
    pub fn resume(&self, target: Arc<dyn PingTarget>) {
        self.start(target);
    }

    /// Cancel the pending timer. Pings already in flight finish on their own.
    pub fn pause(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
            tracing::debug!("Ping timer cancelled");
        }
    }

    /// Whether a timer is armed.
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Pinger {
    fn drop(&mut self) {
        self.pause();
    }
}

async fn run(target: Arc<dyn PingTarget>, steady: Duration) {
    let mut cadence = PingCadence::new(steady);
    loop {
        let target = Arc::clone(&target);
        tokio::spawn(async move { target.ping().await });
        tokio::time::sleep(cadence.tick()).await;
    }
}
