//! Authoritative per-channel state.
//!
//! Each channel is created on first access and owns a [`ChannelState`]
//! behind its own lock together with a broadcast sender. Validating a
//! command, assigning its event id and handing the event to subscribers
//! all happen under that lock, so subscribers see events in id order and a
//! new subscriber's snapshot never misses or repeats an event. Different
//! channels never contend.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use timing_core::{ChannelState, Clock};
use timing_types::{ChannelEvent, ChannelId, Command, Rejection, Snapshot};
use tokio::sync::broadcast;

struct ChannelEntry {
    state: Mutex<ChannelState>,
    events: broadcast::Sender<ChannelEvent>,
}

impl ChannelEntry {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A snapshot paired with the event stream that continues it.
#[derive(Debug)]
pub struct ChannelFeed {
    /// State as of subscription.
    pub snapshot: Snapshot,
    /// Every event after the snapshot, in id order.
    pub events: broadcast::Receiver<ChannelEvent>,
}

/// Map of channel identifier to authoritative state.
pub struct ChannelStore {
    channels: DashMap<ChannelId, Arc<ChannelEntry>>,
    clock: Arc<dyn Clock>,
    event_buffer: usize,
}

impl std::fmt::Debug for ChannelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStore")
            .field("channels", &self.channels.len())
            .field("clock", &self.clock)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

impl ChannelStore {
    /// An empty store stamping updates with `clock`. Each channel buffers
    /// up to `event_buffer` undelivered events per subscriber.
    pub fn new(clock: Arc<dyn Clock>, event_buffer: usize) -> Self {
        Self {
            channels: DashMap::new(),
            clock,
            event_buffer: event_buffer.max(1),
        }
    }

    /// The authoritative clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn entry(&self, channel: &ChannelId) -> Arc<ChannelEntry> {
        if let Some(entry) = self.channels.get(channel) {
            return Arc::clone(entry.value());
        }
        let entry = self
            .channels
            .entry(channel.clone())
            .or_insert_with(|| {
                tracing::debug!("Creating channel {}", channel);
                let (events, _) = broadcast::channel(self.event_buffer);
                Arc::new(ChannelEntry {
                    state: Mutex::new(ChannelState::new(self.clock.now())),
                    events,
                })
            });
        Arc::clone(entry.value())
    }

    /// Current state of `channel`, creating it if needed.
    pub fn snapshot(&self, channel: &ChannelId) -> Snapshot {
        self.entry(channel).lock().snapshot()
    }

    /// Snapshot and event stream for `channel`, taken atomically.
    pub fn subscribe(&self, channel: &ChannelId) -> ChannelFeed {
        let entry = self.entry(channel);
        let state = entry.lock();
        ChannelFeed {
            snapshot: state.snapshot(),
            events: entry.events.subscribe(),
        }
    }

    /// Apply `command` to `channel` and broadcast the resulting event.
    ///
    /// A rejected command leaves the channel untouched.
    pub fn apply(&self, channel: &ChannelId, command: Command) -> Result<ChannelEvent, Rejection> {
        let entry = self.entry(channel);
        let mut state = entry.lock();
        let event = state.apply(command, self.clock.now())?;
        // No receivers is fine: nobody is listening yet.
        let _ = entry.events.send(event);
        Ok(event)
    }

    /// Number of channels created so far.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel exists yet.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Live event streams across all channels.
    pub fn subscriber_count(&self) -> usize {
        self.channels
            .iter()
            .map(|entry| entry.value().events.receiver_count())
            .sum()
    }
}
