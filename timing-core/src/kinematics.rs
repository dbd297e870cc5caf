//! Constant-acceleration extrapolation.

use timing_types::MotionVector;

/// Project `vector` to time `at` assuming constant acceleration.
///
/// `at` may be earlier than the vector's timestamp; the result is then a
/// projection into the past.
pub fn extrapolate(vector: &MotionVector, at: f64) -> MotionVector {
    let delta = at - vector.timestamp;
    MotionVector {
        position: vector.position
            + vector.velocity * delta
            + 0.5 * vector.acceleration * delta * delta,
        velocity: vector.velocity + vector.acceleration * delta,
        acceleration: vector.acceleration,
        timestamp: at,
    }
}
