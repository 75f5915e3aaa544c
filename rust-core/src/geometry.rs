//! Line intersection in (time, magnitude) space.
//!
//! Threshold crossings happen between samples. Intersecting the line through
//! two consecutive signal samples with the line through the matching
//! threshold samples gives the sub-sample crossing instant.

use crate::types::TimePoint;

/// Perpendicular of a 2D vector (rotated 90° counter-clockwise).
fn perp(v: (f64, f64)) -> (f64, f64) {
    (-v.1, v.0)
}

fn dot(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

fn sub(a: TimePoint, b: TimePoint) -> (f64, f64) {
    (a.t - b.t, a.value - b.value)
}

/// Intersect the line through `a1`, `a2` with the line through `b1`, `b2`.
///
/// Lines are infinite: the result may fall outside either segment. Returns
/// `None` when the lines are parallel or a pair of points coincides, which
/// callers treat as "no crossing time determinable".
pub fn intersect(a1: TimePoint, a2: TimePoint, b1: TimePoint, b2: TimePoint) -> Option<TimePoint> {
    let da = sub(a2, a1);
    let db = sub(b2, b1);
    let dp = sub(a1, b1);
    let dap = perp(da);

    let denom = dot(dap, db);
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let ratio = dot(dap, dp) / denom;

    Some(TimePoint::new(b1.t + ratio * db.0, b1.value + ratio * db.1))
}
