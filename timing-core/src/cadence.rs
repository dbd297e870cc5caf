//! Adaptive ping schedule.
//!
//! Right after connecting, pings go out quickly so the skew estimate
//! settles fast; then the rate drops to a medium interval for a few ticks,
//! and finally to a slow steady interval.
//!
//! | Tick   | Delay before next ping |
//! |--------|------------------------|
//! | 1-2    | 20 ms                  |
//! | 3-9    | 500 ms                 |
//! | 10+    | steady (default 1 s)   |

use std::time::Duration;

/// Tick count at which the schedule switches from fast to medium.
pub const SWITCH_MEDIUM: u32 = 3;
/// Tick count at which the schedule switches from medium to steady.
pub const SWITCH_STEADY: u32 = 10;
/// Fast-phase interval.
pub const FAST_INTERVAL: Duration = Duration::from_millis(20);
/// Medium-phase interval.
pub const MEDIUM_INTERVAL: Duration = Duration::from_millis(500);
/// Default steady-state interval.
pub const DEFAULT_STEADY_INTERVAL: Duration = Duration::from_secs(1);

/// Tick counter producing the delay before each next ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingCadence {
    steady: Duration,
    ticks: u32,
}

impl PingCadence {
    /// A schedule settling at `steady`.
    pub fn new(steady: Duration) -> Self {
        Self { steady, ticks: 0 }
    }

    /// Restart from the fast phase.
    pub fn reset(&mut self) {
        self.ticks = 0;
    }

    /// Count one tick and return how long to wait before the next one.
    pub fn tick(&mut self) -> Duration {
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks < SWITCH_MEDIUM {
            FAST_INTERVAL
        } else if self.ticks < SWITCH_STEADY {
            MEDIUM_INTERVAL
        } else {
            self.steady
        }
    }

    /// Ticks counted since the last reset.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// The steady-state interval.
    pub fn steady_interval(&self) -> Duration {
        self.steady
    }
}

impl Default for PingCadence {
    fn default() -> Self {
        Self::new(DEFAULT_STEADY_INTERVAL)
    }
}
