//! Threshold crossing detection and step validation.
//!
//! A single forward scan over conditioned samples. Each sample is checked
//! against three mutually exclusive branches, in priority order:
//!
//! 1. **Arm**: the filtered magnitude rises above the threshold while no
//!    interval is open and the axis gate holds. A positive crossing opens a
//!    step interval and counts one more consecutive peak.
//! 2. **Close**: the magnitude falls below the threshold while an interval is
//!    open. The interval's peak becomes a candidate; once enough consecutive
//!    peaks have been seen it must pass the interval, cadence, amplitude and
//!    dwell rules. A failed candidate resets the consecutive peak count.
//! 3. **Idle**: no interval is open. A stale run of peaks is dropped when the
//!    residual noise is high long after the last step, and the most recent
//!    step is revoked when the walk stops right after it.
//!
//! Crossing instants are interpolated between samples with
//! [`crate::geometry::intersect`].

use tracing::{debug, trace};

use crate::cadence::cadence_of_steps;
use crate::config::StepCounterConfig;
use crate::error::Result;
use crate::geometry::intersect;
use crate::types::{
    AcceptedStep, ConditionedSample, CrossingDirection, CrossingEvent, RejectReason,
    StepCountResult, TimePoint, TimeSeries, ValidatorEvent,
};

/// An open positive-to-negative crossing interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenInterval {
    /// Crossing that opened the interval.
    pub positive: CrossingEvent,
    /// First sample of maximum magnitude seen so far.
    pub peak: AcceptedStep,
    /// Maximum magnitude strictly before the closing sample.
    pub amplitude: f64,
}

impl OpenInterval {
    fn open(positive: CrossingEvent, sample: &ConditionedSample) -> Self {
        Self {
            positive,
            peak: step_at(sample),
            amplitude: sample.filtered,
        }
    }

    fn extend(&mut self, sample: &ConditionedSample) {
        if sample.filtered > self.peak.magnitude {
            self.peak = step_at(sample);
        }
        self.amplitude = self.amplitude.max(sample.filtered);
    }

    /// Peak over the whole interval including the closing sample.
    fn peak_with(&self, closing: &ConditionedSample) -> AcceptedStep {
        if closing.filtered > self.peak.magnitude {
            step_at(closing)
        } else {
            self.peak
        }
    }
}

/// Mutable state of the validator. Reset only at stream start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatorState {
    interval: Option<OpenInterval>,
    consecutive_peaks: usize,
    last_accepted: Option<AcceptedStep>,
    accepted: Vec<AcceptedStep>,
}

impl ValidatorState {
    /// Whether a step interval is currently open.
    pub fn armed(&self) -> bool {
        self.interval.is_some()
    }

    /// The open interval, if armed.
    pub fn interval(&self) -> Option<&OpenInterval> {
        self.interval.as_ref()
    }

    /// Arm cycles seen since the last reset of the run.
    pub fn consecutive_peaks(&self) -> usize {
        self.consecutive_peaks
    }

    /// Most recently accepted step. Stays set when that step is revoked: it
    /// remains the time anchor for the interval and idle rules.
    pub fn last_accepted(&self) -> Option<&AcceptedStep> {
        self.last_accepted.as_ref()
    }

    /// Accepted steps still standing.
    pub fn accepted(&self) -> &[AcceptedStep] {
        &self.accepted
    }
}

/// Rule-gated step validator.
///
/// Feed conditioned samples in order with [`StepValidator::observe`]; read
/// the outcome with [`StepValidator::result`] or [`StepValidator::finish`].
#[derive(Debug, Clone)]
pub struct StepValidator {
    config: StepCounterConfig,
    state: ValidatorState,
    previous: Option<(TimePoint, TimePoint)>,
    positive_crossings: Vec<CrossingEvent>,
    negative_crossings: Vec<CrossingEvent>,
    revoked: Vec<AcceptedStep>,
    cadence_series: TimeSeries,
}

impl StepValidator {
    /// Create a validator. Fails if the configuration is invalid.
    pub fn new(config: &StepCounterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            state: ValidatorState::default(),
            previous: None,
            positive_crossings: Vec::new(),
            negative_crossings: Vec::new(),
            revoked: Vec::new(),
            cadence_series: Vec::new(),
        })
    }

    /// Process one conditioned sample.
    ///
    /// Returns the event the sample caused, if any. At most one event is
    /// produced per sample.
    pub fn observe(&mut self, sample: &ConditionedSample) -> Option<ValidatorEvent> {
        let event = match self.state.interval.take() {
            None if sample.filtered > sample.threshold && self.axis_gate(&sample.axes) => {
                Some(self.arm(sample))
            }
            None => self.idle(sample),
            Some(open) if sample.filtered < sample.threshold => Some(self.close(open, sample)),
            Some(mut open) => {
                open.extend(sample);
                self.state.interval = Some(open);
                None
            }
        };
        self.previous = Some((sample.filtered_point(), sample.threshold_point()));
        event
    }

    /// Current validator state.
    pub fn state(&self) -> &ValidatorState {
        &self.state
    }

    /// Accepted steps still standing.
    pub fn step_count(&self) -> usize {
        self.state.accepted.len()
    }

    pub fn config(&self) -> &StepCounterConfig {
        &self.config
    }

    /// Snapshot of the outcome so far.
    pub fn result(&self) -> StepCountResult {
        StepCountResult {
            step_count: self.state.accepted.len(),
            accepted_steps: self.state.accepted.clone(),
            revoked_steps: self.revoked.clone(),
            positive_crossings: self.positive_crossings.clone(),
            negative_crossings: self.negative_crossings.clone(),
            cadence_series: self.cadence_series.clone(),
        }
    }

    /// Consume the validator and return its outcome.
    pub fn finish(self) -> StepCountResult {
        StepCountResult {
            step_count: self.state.accepted.len(),
            accepted_steps: self.state.accepted,
            revoked_steps: self.revoked,
            positive_crossings: self.positive_crossings,
            negative_crossings: self.negative_crossings,
            cadence_series: self.cadence_series,
        }
    }

    /// Return to the start-of-stream state, keeping the configuration.
    pub fn reset(&mut self) {
        self.state = ValidatorState::default();
        self.previous = None;
        self.positive_crossings.clear();
        self.negative_crossings.clear();
        self.revoked.clear();
        self.cadence_series.clear();
    }

    // =========================================================================
    // PRIVATE METHODS
    // =========================================================================

    /// Per-axis arm gate.
    ///
    /// The z comparison uses `axis_z_min` on both sides, so it only fails
    /// when z equals that bound exactly. `axis_z_max` is not consulted.
    fn axis_gate(&self, axes: &[f64; 3]) -> bool {
        let [x, y, z] = *axes;
        let c = &self.config;
        x < c.axis_x_min || y > c.axis_y_min || z < c.axis_z_min || z > c.axis_z_min
    }

    fn crossing(&self, direction: CrossingDirection, sample: &ConditionedSample) -> CrossingEvent {
        let point = self.previous.and_then(|(prev_signal, prev_threshold)| {
            intersect(
                sample.filtered_point(),
                prev_signal,
                sample.threshold_point(),
                prev_threshold,
            )
        });
        CrossingEvent {
            direction,
            source_index: sample.index,
            sample: sample.filtered_point(),
            point,
        }
    }

    fn arm(&mut self, sample: &ConditionedSample) -> ValidatorEvent {
        let positive = self.crossing(CrossingDirection::Positive, sample);
        self.positive_crossings.push(positive);
        self.state.consecutive_peaks += 1;
        self.state.interval = Some(OpenInterval::open(positive, sample));

        trace!(
            index = sample.index,
            t = sample.t,
            consecutive_peaks = self.state.consecutive_peaks,
            "armed"
        );
        ValidatorEvent::Armed {
            crossing: positive,
            consecutive_peaks: self.state.consecutive_peaks,
        }
    }

    fn close(&mut self, open: OpenInterval, sample: &ConditionedSample) -> ValidatorEvent {
        let negative = self.crossing(CrossingDirection::Negative, sample);
        self.negative_crossings.push(negative);
        let candidate = open.peak_with(sample);

        if self.state.consecutive_peaks < self.config.min_consecutive_peaks {
            trace!(
                index = sample.index,
                consecutive_peaks = self.state.consecutive_peaks,
                "disarmed during warm-up"
            );
            return ValidatorEvent::Disarmed {
                crossing: negative,
                consecutive_peaks: self.state.consecutive_peaks,
            };
        }

        match self.evaluate(&open, &negative, &candidate) {
            Ok(()) => {
                self.state.accepted.push(candidate);
                self.state.last_accepted = Some(candidate);
                let hz = cadence_of_steps(&self.state.accepted, self.config.min_consecutive_peaks);
                self.cadence_series.push(TimePoint::new(candidate.t, hz));

                debug!(
                    index = candidate.index,
                    t = candidate.t,
                    magnitude = candidate.magnitude,
                    cadence_hz = hz,
                    steps = self.state.accepted.len(),
                    "step accepted"
                );
                ValidatorEvent::Accepted {
                    crossing: negative,
                    step: candidate,
                }
            }
            Err(reason) => {
                self.state.consecutive_peaks = 0;
                debug!(index = candidate.index, t = candidate.t, ?reason, "step rejected");
                ValidatorEvent::Rejected {
                    crossing: negative,
                    candidate,
                    reason,
                }
            }
        }
    }

    /// Acceptance rules, checked in order; the first failure is reported.
    fn evaluate(
        &self,
        open: &OpenInterval,
        negative: &CrossingEvent,
        candidate: &AcceptedStep,
    ) -> std::result::Result<(), RejectReason> {
        let c = &self.config;

        if let Some(last) = &self.state.last_accepted {
            let interval_s = candidate.t - last.t;
            let in_stride = c.step_interval_min < interval_s && interval_s < c.step_interval_max;
            if !in_stride {
                return Err(RejectReason::IntervalOutOfRange { interval_s });
            }
        }

        let cadence_hz = cadence_of_steps(&self.state.accepted, c.min_consecutive_peaks);
        if cadence_hz >= c.max_cadence {
            return Err(RejectReason::CadenceTooHigh { cadence_hz });
        }

        let in_band = c.peak_min <= open.amplitude && open.amplitude <= c.peak_max;
        if !in_band {
            return Err(RejectReason::AmplitudeOutOfRange {
                peak: open.amplitude,
            });
        }

        match (open.positive.time(), negative.time()) {
            (Some(rise), Some(fall)) => {
                let dwell_s = fall - rise;
                if dwell_s <= c.min_dwell {
                    return Err(RejectReason::DwellTooShort { dwell_s });
                }
            }
            _ => return Err(RejectReason::CrossingUndefined),
        }

        Ok(())
    }

    fn idle(&mut self, sample: &ConditionedSample) -> Option<ValidatorEvent> {
        let last = self.state.last_accepted?;
        let elapsed = sample.t - last.t;
        let c = &self.config;

        if elapsed > c.step_interval_max
            && self.state.consecutive_peaks != 0
            && sample.noise >= c.noise_floor
        {
            self.state.consecutive_peaks = 0;
            debug!(t = sample.t, noise = sample.noise, "stale arm cycles dropped");
            return Some(ValidatorEvent::StaleReset {
                t: sample.t,
                noise: sample.noise,
            });
        }

        if self.state.consecutive_peaks >= c.min_consecutive_peaks
            && !self.state.accepted.is_empty()
            && elapsed >= c.step_interval_max
        {
            self.state.consecutive_peaks = 0;
            let step = self.state.accepted.pop()?;
            self.cadence_series.pop();
            self.revoked.push(step);
            debug!(
                t = sample.t,
                revoked_t = step.t,
                steps = self.state.accepted.len(),
                "last step revoked"
            );
            return Some(ValidatorEvent::Revoked { t: sample.t, step });
        }

        None
    }
}

fn step_at(sample: &ConditionedSample) -> AcceptedStep {
    AcceptedStep {
        index: sample.index,
        t: sample.t,
        magnitude: sample.filtered,
    }
}

/// Run a validator over a complete conditioned stream.
pub fn validate_steps(
    samples: &[ConditionedSample],
    config: &StepCounterConfig,
) -> Result<StepCountResult> {
    let mut validator = StepValidator::new(config)?;
    for sample in samples {
        validator.observe(sample);
    }
    Ok(validator.finish())
}

// ============================================================================
// TESTS
// ============================================================================
