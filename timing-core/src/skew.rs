//! Clock skew estimation from ping round trips.
//!
//! Each round trip yields a [`SkewSample`]. The estimator keeps the most
//! recent samples in a fixed window and exposes the skew of the sample
//! with the lowest latency, since that one bounds the true offset most
//! tightly.

use std::collections::VecDeque;

/// Default number of samples kept.
pub const DEFAULT_WINDOW: usize = 30;

/// One ping round trip, all times in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewSample {
    /// Local clock when the ping was sent.
    pub send_time: f64,
    /// Peer clock when the peer answered.
    pub peer_time: f64,
    /// Local clock when the answer arrived.
    pub receive_time: f64,
}

impl SkewSample {
    /// Build a sample from the three clock readings.
    pub fn new(send_time: f64, peer_time: f64, receive_time: f64) -> Self {
        Self {
            send_time,
            peer_time,
            receive_time,
        }
    }

    /// Half the round trip time.
    pub fn latency(&self) -> f64 {
        (self.receive_time - self.send_time) / 2.0
    }

    /// Peer clock minus local clock, assuming a symmetric path.
    pub fn skew(&self) -> f64 {
        self.peer_time - (self.send_time + self.receive_time) / 2.0
    }

    /// Whether all three readings are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.send_time.is_finite() && self.peer_time.is_finite() && self.receive_time.is_finite()
    }
}

/// Sliding window of samples with a minimum-latency estimate.
#[derive(Debug, Clone)]
pub struct SkewEstimator {
    capacity: usize,
    window: VecDeque<SkewSample>,
    current: Option<f64>,
}

impl SkewEstimator {
    /// An empty estimator holding at most `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: VecDeque::with_capacity(capacity),
            current: None,
        }
    }

    /// Record a sample, evicting the oldest one if the window is full.
    ///
    /// Returns the new estimate only if it differs from the previously
    /// exposed one. Samples with a non-finite reading are discarded.
    pub fn record(&mut self, sample: SkewSample) -> Option<f64> {
        if !sample.is_finite() {
            return None;
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        // Ties go to the newer sample.
        let best = self
            .window
            .iter()
            .fold(None::<&SkewSample>, |best, s| match best {
                Some(b) if b.latency() < s.latency() => Some(b),
                _ => Some(s),
            })?
            .skew();

        if self.current == Some(best) {
            return None;
        }
        self.current = Some(best);
        Some(best)
    }

    /// The exposed skew, `None` until the first sample.
    pub fn skew(&self) -> Option<f64> {
        self.current
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether no samples are held.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SkewEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A sample with the given latency and skew, sent at local time `at`.
    fn sample(at: f64, latency: f64, skew: f64) -> SkewSample {
        SkewSample::new(at, at + latency + skew, at + 2.0 * latency)
    }

    #[test]
    fn derived_values() {
        let s = SkewSample::new(10.0, 115.0, 30.0);
        assert_eq!(s.latency(), 10.0);
        assert_eq!(s.skew(), 95.0);
    }

    #[test]
    fn starts_unknown() {
        let estimator = SkewEstimator::default();
        assert_eq!(estimator.skew(), None);
        assert!(estimator.is_empty());
        assert_eq!(estimator.capacity(), DEFAULT_WINDOW);
    }

    #[test]
    fn exposes_minimum_latency_skew() {
        let mut estimator = SkewEstimator::default();
        assert_eq!(estimator.record(sample(0.0, 50.0, 100.0)), Some(100.0));
        assert_eq!(estimator.record(sample(1.0, 10.0, 20.0)), Some(20.0));
        // Higher latency, ignored.
        assert_eq!(estimator.record(sample(2.0, 30.0, 55.0)), None);
        assert_eq!(estimator.skew(), Some(20.0));

        // A tighter sample takes over immediately.
        assert_eq!(estimator.record(sample(3.0, 5.0, 18.0)), Some(18.0));
        assert_eq!(estimator.skew(), Some(18.0));
    }

    #[test]
    fn unchanged_estimate_reports_nothing() {
        let mut estimator = SkewEstimator::default();
        assert_eq!(estimator.record(sample(0.0, 10.0, 20.0)), Some(20.0));
        // Same latency, same skew: the newer sample wins but the value is equal.
        assert_eq!(estimator.record(sample(1.0, 10.0, 20.0)), None);
        assert_eq!(estimator.record(sample(2.0, 40.0, 7.0)), None);
    }

    #[test]
    fn oldest_sample_evicted_on_overflow() {
        let mut estimator = SkewEstimator::new(3);
        estimator.record(sample(0.0, 1.0, 100.0));
        estimator.record(sample(1.0, 20.0, 5.0));
        estimator.record(sample(2.0, 30.0, 6.0));
        assert_eq!(estimator.skew(), Some(100.0));
        assert_eq!(estimator.len(), 3);

        // Evicts the 1.0-latency sample; best is now latency 20.
        assert_eq!(estimator.record(sample(3.0, 40.0, 7.0)), Some(5.0));
        assert_eq!(estimator.len(), 3);
    }

    #[test]
    fn non_finite_samples_are_discarded() {
        let mut estimator = SkewEstimator::default();
        assert_eq!(estimator.record(SkewSample::new(0.0, f64::NAN, 1.0)), None);
        assert_eq!(estimator.skew(), None);
        assert!(estimator.is_empty());

        assert_eq!(estimator.record(sample(1.0, 10.0, 20.0)), Some(20.0));
        assert_eq!(
            estimator.record(SkewSample::new(2.0, f64::INFINITY, 2.0)),
            None
        );
        assert_eq!(estimator.record(sample(3.0, 10.0, 20.0)), None);
        assert_eq!(estimator.skew(), Some(20.0));
        assert_eq!(estimator.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut estimator = SkewEstimator::new(0);
        assert_eq!(estimator.capacity(), 1);
        estimator.record(sample(0.0, 1.0, 1.0));
        assert_eq!(estimator.record(sample(1.0, 9.0, 2.0)), Some(2.0));
        assert_eq!(estimator.len(), 1);
    }
}
