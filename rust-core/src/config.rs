//! Tunable parameters for the step detection pipeline.
//!
//! Every stage receives the same immutable [`StepCounterConfig`]. Defaults are
//! tuned for a body-worn accelerometer reporting in g-units;
//! the symbol used in the gait literature is given next to each field.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, StepError};

/// Which conditioned signal the adaptive threshold is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ThresholdBaseline {
    /// Hysteretic median output.
    #[default]
    Filtered,
    /// Moving average of the hysteretic median output. Smoother, reacts later.
    MovingAverage,
}

/// Configuration for the complete step counting pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepCounterConfig {
    /// Median filter hysteresis band in g (λ_M).
    /// Median changes smaller than this keep the previous output.
    pub hysteresis_band: f64,

    /// Axis-x arm gate in g (A_xmin).
    pub axis_x_min: f64,
    /// Axis-y arm gate in g (A_ymin).
    pub axis_y_min: f64,
    /// Axis-z arm gate in g (A_zmin), applied as both lower and upper bound.
    pub axis_z_min: f64,
    /// Axis-z upper bound in g (A_zmax). Reserved: carried but not consulted
    /// by the arm gate.
    pub axis_z_max: f64,

    /// Lower bound of the accepted peak amplitude in g (Acc_min).
    pub peak_min: f64,
    /// Upper bound of the accepted peak amplitude in g (Acc_max).
    pub peak_max: f64,

    /// Minimum time between accepted steps in seconds (T_stmin).
    pub step_interval_min: f64,
    /// Maximum time between accepted steps in seconds (T_stmax).
    /// Also the idle period after which stale arm cycles are dropped.
    pub step_interval_max: f64,

    /// Minimum time between positive and negative crossing, in seconds (T).
    pub min_dwell: f64,

    /// Arm cycles required in a row before candidates are evaluated (St_min).
    /// Also the history length used for the cadence ceiling.
    pub min_consecutive_peaks: usize,

    /// Noise floor on the windowed residual mean square (St_RMS).
    pub noise_floor: f64,

    /// Cadence ceiling in Hz (Stf_max).
    pub max_cadence: f64,

    /// Moving-average window in samples, used for the baseline and the
    /// per-axis smoothed signals.
    pub window_length: usize,

    /// Duration of the trailing noise window in seconds.
    pub noise_window: f64,

    /// Resting-state floor of the adaptive threshold in g.
    pub threshold_floor: f64,

    /// Timestamp units per second. Source recordings use nanoseconds.
    pub timestamp_divisor: f64,

    /// Signal the adaptive threshold is derived from.
    pub threshold_baseline: ThresholdBaseline,
}

impl Default for StepCounterConfig {
    fn default() -> Self {
        Self {
            hysteresis_band: 0.017,
            axis_x_min: 0.25,
            axis_y_min: 0.15,
            axis_z_min: -0.36,
            axis_z_max: 0.80,
            peak_min: 1.04,
            peak_max: 2.50,
            step_interval_min: 0.30,
            step_interval_max: 1.50,
            min_dwell: 0.12,
            min_consecutive_peaks: 6,
            noise_floor: 0.08,
            max_cadence: 3.00,
            window_length: 40,
            noise_window: 15.0,
            threshold_floor: 1.033,
            timestamp_divisor: 1e9,
            threshold_baseline: ThresholdBaseline::Filtered,
        }
    }
}

impl StepCounterConfig {
    /// Check that the configuration can drive the pipeline.
    ///
    /// Called by `StepCounter::new`, `StepValidator::new` and the batch entry
    /// points.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("hysteresis_band", self.hysteresis_band),
            ("axis_x_min", self.axis_x_min),
            ("axis_y_min", self.axis_y_min),
            ("axis_z_min", self.axis_z_min),
            ("axis_z_max", self.axis_z_max),
            ("peak_min", self.peak_min),
            ("peak_max", self.peak_max),
            ("step_interval_min", self.step_interval_min),
            ("step_interval_max", self.step_interval_max),
            ("min_dwell", self.min_dwell),
            ("noise_floor", self.noise_floor),
            ("max_cadence", self.max_cadence),
            ("noise_window", self.noise_window),
            ("threshold_floor", self.threshold_floor),
            ("timestamp_divisor", self.timestamp_divisor),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(StepError::invalid(field, format!("must be finite, got {value}")));
            }
        }

        if self.hysteresis_band < 0.0 {
            return Err(StepError::invalid("hysteresis_band", "must not be negative"));
        }
        if self.window_length == 0 {
            return Err(StepError::invalid("window_length", "must be at least 1"));
        }
        if self.min_consecutive_peaks == 0 {
            return Err(StepError::invalid("min_consecutive_peaks", "must be at least 1"));
        }
        if self.timestamp_divisor <= 0.0 {
            return Err(StepError::invalid("timestamp_divisor", "must be positive"));
        }
        if self.noise_window <= 0.0 {
            return Err(StepError::invalid("noise_window", "must be positive"));
        }
        if self.peak_min > self.peak_max {
            return Err(StepError::invalid(
                "peak_min",
                format!("{} exceeds peak_max {}", self.peak_min, self.peak_max),
            ));
        }
        if self.step_interval_min < 0.0 || self.step_interval_min >= self.step_interval_max {
            return Err(StepError::invalid(
                "step_interval_min",
                format!(
                    "must lie in [0, step_interval_max), got {} with max {}",
                    self.step_interval_min, self.step_interval_max
                ),
            ));
        }
        if self.min_dwell < 0.0 {
            return Err(StepError::invalid("min_dwell", "must not be negative"));
        }
        if self.max_cadence <= 0.0 {
            return Err(StepError::invalid("max_cadence", "must be positive"));
        }
        Ok(())
    }

    /// Number of samples the trailing buffers hold at a given sample rate.
    ///
    /// The largest of the median window, the moving-average window and the
    /// noise window expressed in samples.
    pub fn buffer_depth(&self, sample_rate_hz: f64) -> usize {
        let noise_samples = (self.noise_window * sample_rate_hz).ceil().max(0.0) as usize + 1;
        3.max(self.window_length).max(noise_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = StepCounterConfig::default();
        assert_eq!(config.hysteresis_band, 0.017);
        assert_eq!(config.axis_z_min, -0.36);
        assert_eq!(config.axis_z_max, 0.80);
        assert_eq!(config.min_consecutive_peaks, 6);
        assert_eq!(config.window_length, 40);
        assert_eq!(config.noise_window, 15.0);
        assert_eq!(config.threshold_floor, 1.033);
        assert_eq!(config.threshold_baseline, ThresholdBaseline::Filtered);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_window() {
        let config = StepCounterConfig {
            window_length: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            StepError::InvalidConfig { field: "window_length", .. }
        ));
    }

    #[test]
    fn test_rejects_inverted_bands() {
        let peaks = StepCounterConfig {
            peak_min: 3.0,
            ..Default::default()
        };
        assert!(peaks.validate().is_err());

        let intervals = StepCounterConfig {
            step_interval_min: 2.0,
            ..Default::default()
        };
        assert!(intervals.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_divisor_and_nan() {
        let divisor = StepCounterConfig {
            timestamp_divisor: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            divisor.validate(),
            Err(StepError::InvalidConfig { field: "timestamp_divisor", .. })
        ));

        let nan = StepCounterConfig {
            noise_floor: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            nan.validate(),
            Err(StepError::InvalidConfig { field: "noise_floor", .. })
        ));
    }

    #[test]
    fn test_buffer_depth() {
        let config = StepCounterConfig::default();
        // 15 s at 50 Hz dominates the 40-sample average window.
        assert_eq!(config.buffer_depth(50.0), 751);

        let short = StepCounterConfig {
            noise_window: 0.01,
            window_length: 2,
            ..Default::default()
        };
        assert_eq!(short.buffer_depth(50.0), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StepCounterConfig =
            serde_json::from_str(r#"{"window_length": 20, "threshold_baseline": "moving_average"}"#)
                .unwrap();
        assert_eq!(config.window_length, 20);
        assert_eq!(config.threshold_baseline, ThresholdBaseline::MovingAverage);
        assert_eq!(config.min_consecutive_peaks, 6);
    }
}
