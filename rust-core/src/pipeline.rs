//! Complete step counting pipeline integrating all processing stages.
//!
//! This module orchestrates the data flow from raw accelerometer samples
//! through conditioning, thresholding and validation to a final
//! [`StepCountResult`].
//!
//! # Architecture
//!
//! 1. **Signal conditioning**: magnitude, hysteretic median, baseline and
//!    per-axis moving averages
//! 2. **Thresholding**: lagged adaptive threshold and the residual noise floor
//! 3. **Validation**: crossing detection and the step rule state machine
//!
//! Two entry points share the same stages. [`StepCounter`] is streaming: one
//! sample in, at most one [`ValidatorEvent`] out. [`count_steps`] and
//! [`condition`] work on a whole recording and expose every intermediate
//! series for diagnostics. Both produce identical results for the same input.

use tracing::info;

use crate::config::{StepCounterConfig, ThresholdBaseline};
use crate::error::Result;
use crate::signal::{
    axis_moving_averages, magnitude, moving_average_series, moving_median_hysteresis,
    SignalConditioner,
};
use crate::step_detection::{validate_steps, StepValidator};
use crate::threshold::{
    high_pass_residual, threshold, windowed_rms, AdaptiveThreshold, NoiseFloorEstimator,
};
use crate::types::{ConditionedSample, Sample, StepCountResult, TimeSeries, ValidatorEvent};

// ============================================================================
// STREAMING
// ============================================================================

/// Streaming step counter.
///
/// Maintains state across all stages. Memory is bounded by the moving-average
/// window, the noise window and the accepted steps themselves.
#[derive(Debug, Clone)]
pub struct StepCounter {
    config: StepCounterConfig,

    // Processing stages
    conditioner: SignalConditioner,
    threshold: AdaptiveThreshold,
    noise: NoiseFloorEstimator,
    validator: StepValidator,

    last_sample: Option<ConditionedSample>,
}

impl StepCounter {
    /// Create a counter. Fails if the configuration is invalid.
    pub fn new(config: StepCounterConfig) -> Result<Self> {
        let validator = StepValidator::new(&config)?;
        Ok(Self {
            conditioner: SignalConditioner::new(&config),
            threshold: AdaptiveThreshold::new(config.threshold_floor),
            noise: NoiseFloorEstimator::new(config.noise_window),
            validator,
            config,
            last_sample: None,
        })
    }

    /// Condition one raw sample and feed it to the validator.
    ///
    /// Returns the validator event the sample caused, if any.
    pub fn observe(&mut self, sample: &Sample) -> Option<ValidatorEvent> {
        let conditioned = self.condition_sample(sample);
        self.last_sample = Some(conditioned);
        self.validator.observe(&conditioned)
    }

    /// Feed a run of samples, collecting the events they cause.
    pub fn process_batch(&mut self, samples: &[Sample]) -> Vec<ValidatorEvent> {
        samples.iter().filter_map(|s| self.observe(s)).collect()
    }

    /// Derived signals of the most recent sample.
    pub fn last_sample(&self) -> Option<&ConditionedSample> {
        self.last_sample.as_ref()
    }

    /// Accepted steps still standing.
    pub fn step_count(&self) -> usize {
        self.validator.step_count()
    }

    /// Number of samples processed since creation or the last reset.
    pub fn total_samples(&self) -> usize {
        self.conditioner.sample_count()
    }

    pub fn config(&self) -> &StepCounterConfig {
        &self.config
    }

    pub fn validator(&self) -> &StepValidator {
        &self.validator
    }

    /// Snapshot of the outcome so far.
    pub fn result(&self) -> StepCountResult {
        self.validator.result()
    }

    /// Finish the stream and return its outcome.
    pub fn finish(self) -> StepCountResult {
        self.validator.finish()
    }

    /// Start a new stream with the same configuration.
    pub fn reset(&mut self) {
        self.conditioner.reset();
        self.threshold.reset();
        self.noise.reset();
        self.validator.reset();
        self.last_sample = None;
    }

    fn condition_sample(&mut self, sample: &Sample) -> ConditionedSample {
        let filtered = self.conditioner.process_sample(sample);
        let source = match self.config.threshold_baseline {
            ThresholdBaseline::Filtered => filtered.filtered,
            ThresholdBaseline::MovingAverage => filtered.baseline,
        };
        let threshold = self.threshold.update(source);
        let residual = filtered.filtered - filtered.baseline;
        let noise = self.noise.update(filtered.t, residual);

        ConditionedSample {
            index: filtered.index,
            t: filtered.t,
            magnitude: filtered.magnitude,
            filtered: filtered.filtered,
            baseline: filtered.baseline,
            residual,
            threshold,
            noise,
            axes: filtered.axes,
        }
    }
}

// ============================================================================
// BATCH
// ============================================================================

/// Every derived series of one recording, aligned index-for-index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionedSignals {
    pub magnitude: TimeSeries,
    pub filtered: TimeSeries,
    pub baseline: TimeSeries,
    pub residual: TimeSeries,
    pub threshold: TimeSeries,
    pub noise: TimeSeries,
    /// Moving averages of the raw x, y and z readings.
    pub axes: [Vec<f64>; 3],
}

impl ConditionedSignals {
    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Seconds between the first and last sample; 0 when empty.
    pub fn duration(&self) -> f64 {
        self.magnitude.last().map_or(0.0, |p| p.t)
    }

    /// All series at index `i`.
    ///
    /// Panics if `i` is out of bounds.
    pub fn sample(&self, i: usize) -> ConditionedSample {
        ConditionedSample {
            index: i,
            t: self.magnitude[i].t,
            magnitude: self.magnitude[i].value,
            filtered: self.filtered[i].value,
            baseline: self.baseline[i].value,
            residual: self.residual[i].value,
            threshold: self.threshold[i].value,
            noise: self.noise[i].value,
            axes: [self.axes[0][i], self.axes[1][i], self.axes[2][i]],
        }
    }

    /// Row view of every sample.
    pub fn samples(&self) -> Vec<ConditionedSample> {
        (0..self.len()).map(|i| self.sample(i)).collect()
    }
}

/// Run the conditioning and thresholding stages over a whole recording.
pub fn condition(samples: &[Sample], config: &StepCounterConfig) -> Result<ConditionedSignals> {
    config.validate()?;

    let magnitude = magnitude(samples, config.timestamp_divisor);
    let filtered = moving_median_hysteresis(&magnitude, config.hysteresis_band);
    let baseline = moving_average_series(&filtered, config.window_length);
    let residual = high_pass_residual(&filtered, &baseline);
    let threshold = match config.threshold_baseline {
        ThresholdBaseline::Filtered => threshold(&filtered, config.threshold_floor),
        ThresholdBaseline::MovingAverage => threshold(&baseline, config.threshold_floor),
    };
    let noise = windowed_rms(&residual, config.noise_window);
    let axes = axis_moving_averages(samples, config.window_length);

    Ok(ConditionedSignals {
        magnitude,
        filtered,
        baseline,
        residual,
        threshold,
        noise,
        axes,
    })
}

/// Count the steps in a complete recording.
///
/// Samples must be ordered by timestamp. Fails only on an invalid
/// configuration.
pub fn count_steps(samples: &[Sample], config: &StepCounterConfig) -> Result<StepCountResult> {
    let signals = condition(samples, config)?;
    let result = validate_steps(&signals.samples(), config)?;

    info!(
        samples = signals.len(),
        duration_s = signals.duration(),
        steps = result.step_count,
        revoked = result.revoked_steps.len(),
        crossings = result.positive_crossings.len(),
        "step count complete"
    );
    Ok(result)
}
