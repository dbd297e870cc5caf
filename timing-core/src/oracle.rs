//! Range validity check.
//!
//! A vector is valid for a range when its position lies inside the closed
//! interval and, if it sits exactly on a bound, it is not moving or
//! accelerating out through that bound. A vector resting on a bound with
//! zero velocity and zero acceleration is valid.

use timing_types::{MotionVector, Range};

/// Whether `vector` is legal within `range`.
pub fn is_valid(vector: &MotionVector, range: &Range) -> bool {
    let MotionVector {
        position,
        velocity,
        acceleration,
        ..
    } = *vector;

    if position < range.start() || position > range.end() {
        return false;
    }

    let leaving_end =
        position == range.end() && (velocity > 0.0 || (velocity == 0.0 && acceleration > 0.0));
    let leaving_start =
        position == range.start() && (velocity < 0.0 || (velocity == 0.0 && acceleration < 0.0));

    !(leaving_end || leaving_start)
}
