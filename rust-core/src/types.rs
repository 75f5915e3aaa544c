//! Core data types for the step sensing engine.
//!
//! This module defines the values that flow between pipeline stages: raw
//! accelerometer samples, time-aligned series, threshold crossings, accepted
//! steps and the validator's events.
//!
//! Crossings, steps and rejections are named types rather than tuples, so a
//! step's time and peak magnitude can never be swapped by position.
//!
//! All derived series share the time base of the magnitude series: seconds
//! relative to the first sample, one entry per input sample.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// INPUT
// ============================================================================

/// A single raw tri-axial accelerometer sample.
///
/// Assumptions:
/// - `timestamp` is monotonically non-decreasing within a stream. The
///   pipeline never sorts; out-of-order input gives unspecified results.
/// - `x`, `y`, `z` are already expressed in g-units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Raw timestamp in source units (see `StepCounterConfig::timestamp_divisor`).
    pub timestamp: i64,
    /// Acceleration along x in g.
    pub x: f64,
    /// Acceleration along y in g.
    pub y: f64,
    /// Acceleration along z in g.
    pub z: f64,
}

impl Sample {
    pub fn new(timestamp: i64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    /// Euclidean norm of the acceleration vector, in g.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Axis readings as an array in x, y, z order.
    pub fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

// ============================================================================
// SERIES
// ============================================================================

/// One point of a time series, or a point in (time, magnitude) space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimePoint {
    /// Seconds since the first sample of the stream.
    pub t: f64,
    /// Value at `t`.
    pub value: f64,
}

impl TimePoint {
    pub fn new(t: f64, value: f64) -> Self {
        Self { t, value }
    }
}

/// Ordered sequence of time points, aligned index-for-index with the
/// magnitude series it derives from.
pub type TimeSeries = Vec<TimePoint>;

/// Every derived signal at one sample index.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConditionedSample {
    /// Position in the stream, starting at 0.
    pub index: usize,
    /// Seconds since the first sample.
    pub t: f64,
    /// Raw acceleration magnitude in g.
    pub magnitude: f64,
    /// Hysteretic moving median of the magnitude.
    pub filtered: f64,
    /// Moving average of `filtered`.
    pub baseline: f64,
    /// High-pass residual, `filtered - baseline`.
    pub residual: f64,
    /// Adaptive threshold.
    pub threshold: f64,
    /// Windowed mean square of the residual.
    pub noise: f64,
    /// Moving averages of the raw x, y, z readings.
    pub axes: [f64; 3],
}

impl ConditionedSample {
    /// The filtered magnitude as a time point.
    pub fn filtered_point(&self) -> TimePoint {
        TimePoint::new(self.t, self.filtered)
    }

    /// The threshold as a time point.
    pub fn threshold_point(&self) -> TimePoint {
        TimePoint::new(self.t, self.threshold)
    }
}

// ============================================================================
// CROSSINGS AND STEPS
// ============================================================================

/// Direction of a threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CrossingDirection {
    /// Signal rose above the threshold; opens a step interval.
    Positive,
    /// Signal fell below the threshold; closes a step interval.
    Negative,
}

/// A detected threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CrossingEvent {
    pub direction: CrossingDirection,
    /// Index of the sample at which the crossing was detected.
    pub source_index: usize,
    /// Filtered magnitude at the detecting sample.
    pub sample: TimePoint,
    /// Interpolated crossing between the detecting sample and its
    /// predecessor. `None` when the two lines are parallel or there is no
    /// predecessor.
    pub point: Option<TimePoint>,
}

impl CrossingEvent {
    /// Interpolated crossing time, if determinable.
    pub fn time(&self) -> Option<f64> {
        self.point.map(|p| p.t)
    }
}

/// A validated step: the peak of one positive-to-negative crossing interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcceptedStep {
    /// Sample index of the peak.
    pub index: usize,
    /// Time of the peak in seconds.
    pub t: f64,
    /// Filtered magnitude at the peak in g.
    pub magnitude: f64,
}

impl AcceptedStep {
    pub fn as_point(&self) -> TimePoint {
        TimePoint::new(self.t, self.magnitude)
    }
}

/// Why a candidate step was turned down.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RejectReason {
    /// Time since the last accepted step fell outside the stride band.
    IntervalOutOfRange { interval_s: f64 },
    /// Cadence over recent accepted steps reached the ceiling.
    CadenceTooHigh { cadence_hz: f64 },
    /// Peak amplitude outside the accepted band.
    AmplitudeOutOfRange { peak: f64 },
    /// Signal stayed above threshold too briefly.
    DwellTooShort { dwell_s: f64 },
    /// A crossing time could not be interpolated.
    CrossingUndefined,
}

/// Observable outcome of feeding one sample to the validator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "event"))]
pub enum ValidatorEvent {
    /// Positive crossing; a step interval is now open.
    Armed {
        crossing: CrossingEvent,
        consecutive_peaks: usize,
    },
    /// Negative crossing during warm-up; the candidate was not evaluated.
    Disarmed {
        crossing: CrossingEvent,
        consecutive_peaks: usize,
    },
    /// Negative crossing whose candidate passed every rule.
    Accepted {
        crossing: CrossingEvent,
        step: AcceptedStep,
    },
    /// Negative crossing whose candidate failed a rule.
    Rejected {
        crossing: CrossingEvent,
        candidate: AcceptedStep,
        reason: RejectReason,
    },
    /// Idle noise abandoned a stale run of arm cycles.
    StaleReset { t: f64, noise: f64 },
    /// The most recent accepted step was withdrawn.
    Revoked { t: f64, step: AcceptedStep },
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Terminal output of one stream.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepCountResult {
    /// Accepted steps remaining after revocations.
    pub step_count: usize,
    /// Accepted steps in time order. Always `step_count` long.
    pub accepted_steps: Vec<AcceptedStep>,
    /// Steps withdrawn by the revoke rule, in revocation order.
    pub revoked_steps: Vec<AcceptedStep>,
    /// Every positive crossing seen.
    pub positive_crossings: Vec<CrossingEvent>,
    /// Every negative crossing seen.
    pub negative_crossings: Vec<CrossingEvent>,
    /// Cadence in Hz at each accepted step.
    pub cadence_series: TimeSeries,
}

impl StepCountResult {
    /// Accepted steps as `(t, magnitude)` points.
    pub fn accepted_points(&self) -> TimeSeries {
        self.accepted_steps.iter().map(AcceptedStep::as_point).collect()
    }

    /// Interpolated positive crossings, skipping undefined ones.
    pub fn positive_points(&self) -> TimeSeries {
        self.positive_crossings.iter().filter_map(|c| c.point).collect()
    }

    /// Interpolated negative crossings, skipping undefined ones.
    pub fn negative_points(&self) -> TimeSeries {
        self.negative_crossings.iter().filter_map(|c| c.point).collect()
    }

    /// Mean of the populated cadence points, ignoring the leading zero of a
    /// bout. Returns 0 when no cadence could be measured.
    pub fn mean_cadence(&self) -> f64 {
        let measured: Vec<f64> = self
            .cadence_series
            .iter()
            .map(|p| p.value)
            .filter(|&hz| hz > 0.0)
            .collect();
        if measured.is_empty() {
            return 0.0;
        }
        measured.iter().sum::<f64>() / measured.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_magnitude() {
        let sample = Sample::new(0, 3.0, 4.0, 12.0);
        assert_eq!(sample.magnitude(), 13.0);
        assert_eq!(sample.axes(), [3.0, 4.0, 12.0]);
    }

    #[test]
    fn test_result_projections() {
        let crossing = |direction, point| CrossingEvent {
            direction,
            source_index: 3,
            sample: TimePoint::new(0.1, 1.2),
            point,
        };
        let result = StepCountResult {
            step_count: 1,
            accepted_steps: vec![AcceptedStep {
                index: 5,
                t: 0.2,
                magnitude: 1.4,
            }],
            revoked_steps: Vec::new(),
            positive_crossings: vec![
                crossing(CrossingDirection::Positive, Some(TimePoint::new(0.09, 1.1))),
                crossing(CrossingDirection::Positive, None),
            ],
            negative_crossings: vec![crossing(CrossingDirection::Negative, None)],
            cadence_series: vec![TimePoint::new(0.2, 0.0)],
        };

        assert_eq!(result.accepted_points(), vec![TimePoint::new(0.2, 1.4)]);
        assert_eq!(result.positive_points(), vec![TimePoint::new(0.09, 1.1)]);
        assert!(result.negative_points().is_empty());
        assert_eq!(result.positive_crossings[0].time(), Some(0.09));
        assert_eq!(result.mean_cadence(), 0.0);
    }

    #[test]
    fn test_mean_cadence_skips_bout_start() {
        let result = StepCountResult {
            cadence_series: vec![
                TimePoint::new(1.0, 0.0),
                TimePoint::new(1.5, 2.0),
                TimePoint::new(2.0, 1.0),
            ],
            ..Default::default()
        };
        assert_eq!(result.mean_cadence(), 1.5);
    }
}
