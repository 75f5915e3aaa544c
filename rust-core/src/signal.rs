//! Signal conditioning: magnitude extraction and smoothing filters.
//!
//! This module provides the low-level filters the detector runs on:
//! - Acceleration magnitude with a stream-relative time base
//! - Hysteretic moving median (debounced 3-sample median)
//! - Moving average, used on the filtered magnitude and on each raw axis
//!
//! Design note: every filter is causal and keeps a bounded trailing buffer,
//! so the same objects serve batch and streaming use. The batch functions
//! below are folds over the streaming filters.

use std::collections::VecDeque;

use crate::config::StepCounterConfig;
use crate::types::{Sample, TimePoint, TimeSeries};

/// Samples in the median window (current plus two prior).
pub const MEDIAN_WINDOW: usize = 3;

// ============================================================================
// STREAMING FILTERS
// ============================================================================

/// Moving median over the last three raw values, debounced by a hysteresis band.
///
/// A new median is adopted only when it differs from the previous output by at
/// least `band`; smaller drifts keep the previous output, which stops the
/// threshold chattering on a flat signal.
#[derive(Debug, Clone)]
pub struct HysteresisMedianFilter {
    band: f64,
    window: VecDeque<f64>,
    output: Option<f64>,
}

impl HysteresisMedianFilter {
    pub fn new(band: f64) -> Self {
        Self {
            band,
            window: VecDeque::with_capacity(MEDIAN_WINDOW),
            output: None,
        }
    }

    /// Push one raw value and return the filtered output.
    pub fn update(&mut self, value: f64) -> f64 {
        if self.window.len() == MEDIAN_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(value);

        let current = median(self.window.iter().copied());
        let next = match self.output {
            Some(previous) if (current - previous).abs() < self.band => previous,
            _ => current,
        };
        self.output = Some(next);
        next
    }

    /// Last output, if any value has been seen.
    pub fn output(&self) -> Option<f64> {
        self.output
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.output = None;
    }
}

/// Arithmetic mean over the last `window` values (fewer at stream start).
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    values: VecDeque<f64>,
}

impl MovingAverage {
    /// Create a moving average. A zero window is treated as one sample.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::with_capacity(window),
        }
    }

    /// Push one value and return the mean of the current window.
    pub fn update(&mut self, value: f64) -> f64 {
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
        // Recomputed over the whole window, no running sum.
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Number of values currently in the window.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// One sample after conditioning, before thresholding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    pub index: usize,
    /// Seconds since the first sample.
    pub t: f64,
    /// Raw magnitude in g.
    pub magnitude: f64,
    /// Hysteretic median of the magnitude.
    pub filtered: f64,
    /// Moving average of `filtered`.
    pub baseline: f64,
    /// Moving averages of the raw axes.
    pub axes: [f64; 3],
}

/// Complete conditioning stage: time base, magnitude, median, baseline and
/// per-axis smoothing.
///
/// This is the hot-path component. Cost per sample is bounded by the
/// moving-average window.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    timestamp_divisor: f64,
    origin: Option<i64>,
    last_timestamp: Option<i64>,
    next_index: usize,
    median: HysteresisMedianFilter,
    baseline: MovingAverage,
    axes: [MovingAverage; 3],
}

impl SignalConditioner {
    pub fn new(config: &StepCounterConfig) -> Self {
        let axis = || MovingAverage::new(config.window_length);
        Self {
            timestamp_divisor: config.timestamp_divisor,
            origin: None,
            last_timestamp: None,
            next_index: 0,
            median: HysteresisMedianFilter::new(config.hysteresis_band),
            baseline: MovingAverage::new(config.window_length),
            axes: [axis(), axis(), axis()],
        }
    }

    /// Condition one raw sample.
    pub fn process_sample(&mut self, sample: &Sample) -> FilteredSample {
        let origin = *self.origin.get_or_insert(sample.timestamp);
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                tracing::warn!(
                    index = self.next_index,
                    timestamp = sample.timestamp,
                    previous = last,
                    "timestamp went backwards; input must be sorted"
                );
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        let t = relative_seconds(sample.timestamp, origin, self.timestamp_divisor);
        let magnitude = sample.magnitude();
        let filtered = self.median.update(magnitude);
        let baseline = self.baseline.update(filtered);
        let axes = [
            self.axes[0].update(sample.x),
            self.axes[1].update(sample.y),
            self.axes[2].update(sample.z),
        ];

        let index = self.next_index;
        self.next_index += 1;

        FilteredSample {
            index,
            t,
            magnitude,
            filtered,
            baseline,
            axes,
        }
    }

    /// Number of samples processed.
    pub fn sample_count(&self) -> usize {
        self.next_index
    }

    /// Reset to the start-of-stream state.
    pub fn reset(&mut self) {
        self.origin = None;
        self.last_timestamp = None;
        self.next_index = 0;
        self.median.reset();
        self.baseline.reset();
        for axis in &mut self.axes {
            axis.reset();
        }
    }
}

// ============================================================================
// BATCH FUNCTIONS
// ============================================================================

/// Acceleration magnitude of each sample, timed relative to the first sample.
pub fn magnitude(samples: &[Sample], timestamp_divisor: f64) -> TimeSeries {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    samples
        .iter()
        .map(|s| {
            TimePoint::new(
                relative_seconds(s.timestamp, first.timestamp, timestamp_divisor),
                s.magnitude(),
            )
        })
        .collect()
}

/// Hysteretic moving median of a series. See [`HysteresisMedianFilter`].
pub fn moving_median_hysteresis(series: &[TimePoint], band: f64) -> TimeSeries {
    let mut filter = HysteresisMedianFilter::new(band);
    series
        .iter()
        .map(|p| TimePoint::new(p.t, filter.update(p.value)))
        .collect()
}

/// Trailing moving average of a plain value sequence.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let mut filter = MovingAverage::new(window);
    values.iter().map(|&v| filter.update(v)).collect()
}

/// Trailing moving average of a series, keeping its timestamps.
pub fn moving_average_series(series: &[TimePoint], window: usize) -> TimeSeries {
    let mut filter = MovingAverage::new(window);
    series
        .iter()
        .map(|p| TimePoint::new(p.t, filter.update(p.value)))
        .collect()
}

/// Moving averages of the raw x, y and z readings.
pub fn axis_moving_averages(samples: &[Sample], window: usize) -> [Vec<f64>; 3] {
    let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.y).collect();
    let zs: Vec<f64> = samples.iter().map(|s| s.z).collect();
    [
        moving_average(&xs, window),
        moving_average(&ys, window),
        moving_average(&zs, window),
    ]
}

fn relative_seconds(timestamp: i64, origin: i64, divisor: f64) -> f64 {
    timestamp.saturating_sub(origin) as f64 / divisor
}

/// Median of a short sequence; even counts average the two middle values.
fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
