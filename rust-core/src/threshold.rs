//! Adaptive threshold and noise floor estimation.
//!
//! The threshold follows the filtered magnitude two samples late, so a rising
//! edge always pokes above it, and never drops below a resting-state floor.
//! The noise floor is the mean square of the high-pass residual (filtered
//! magnitude minus its moving average) over a trailing time window.

use std::collections::VecDeque;

use crate::types::{TimePoint, TimeSeries};

/// Samples the threshold lags behind its source once warmed up.
pub const THRESHOLD_LAG: usize = 2;

// ============================================================================
// ADAPTIVE THRESHOLD
// ============================================================================

/// Lagged, floored threshold.
///
/// At index `i` the threshold is `max(floor, source[j])` with `j = i - 2`
/// when `i - 2 > 0`, else `j = i`. Indices 0, 1 and 2 therefore use their
/// own value.
#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    floor: f64,
    history: VecDeque<f64>,
    seen: usize,
}

impl AdaptiveThreshold {
    pub fn new(floor: f64) -> Self {
        Self {
            floor,
            history: VecDeque::with_capacity(THRESHOLD_LAG + 1),
            seen: 0,
        }
    }

    /// Push the next source value and return the threshold for that index.
    pub fn update(&mut self, value: f64) -> f64 {
        if self.history.len() == THRESHOLD_LAG + 1 {
            self.history.pop_front();
        }
        self.history.push_back(value);
        let index = self.seen;
        self.seen += 1;

        let lagged = if index > THRESHOLD_LAG {
            self.history[0]
        } else {
            value
        };
        self.floor.max(lagged)
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.seen = 0;
    }
}

// ============================================================================
// NOISE FLOOR
// ============================================================================

/// Mean square of the residual over a trailing time window.
///
/// The window at time `t` starts at the most recent sample at least
/// `window_s` older than `t` (the first sample if none is that old), so it is
/// duration based and tolerates irregular sampling.
#[derive(Debug, Clone)]
pub struct NoiseFloorEstimator {
    window_s: f64,
    squares: VecDeque<(f64, f64)>,
}

impl NoiseFloorEstimator {
    pub fn new(window_s: f64) -> Self {
        Self {
            window_s,
            squares: VecDeque::new(),
        }
    }

    /// Push the residual at time `t` and return the windowed mean square.
    pub fn update(&mut self, t: f64, residual: f64) -> f64 {
        let square = residual * residual;
        self.squares.push_back((t, square));

        // Drop the front while its successor is already far enough back to
        // start the window.
        while self.squares.len() >= 2 && t - self.squares[1].0 >= self.window_s {
            self.squares.pop_front();
        }

        self.value()
    }

    /// Current windowed mean square; 0 for an empty window.
    ///
    /// NaN while a non-finite residual is inside the window.
    pub fn value(&self) -> f64 {
        if self.squares.is_empty() {
            return 0.0;
        }
        // Recomputed over the whole window, so a non-finite square stops
        // counting once it leaves.
        self.squares.iter().map(|(_, square)| square).sum::<f64>() / self.squares.len() as f64
    }

    /// Samples currently inside the window.
    pub fn window_len(&self) -> usize {
        self.squares.len()
    }

    pub fn reset(&mut self) {
        self.squares.clear();
    }
}

// ============================================================================
// BATCH FUNCTIONS
// ============================================================================

/// Adaptive threshold series. See [`AdaptiveThreshold`].
pub fn threshold(series: &[TimePoint], floor: f64) -> TimeSeries {
    let mut estimator = AdaptiveThreshold::new(floor);
    series
        .iter()
        .map(|p| TimePoint::new(p.t, estimator.update(p.value)))
        .collect()
}

/// Sample-aligned `filtered - baseline`.
///
/// Panics if the series differ in length.
pub fn high_pass_residual(filtered: &[TimePoint], baseline: &[TimePoint]) -> TimeSeries {
    assert_eq!(
        filtered.len(),
        baseline.len(),
        "residual inputs must be sample-aligned"
    );
    filtered
        .iter()
        .zip(baseline)
        .map(|(f, b)| TimePoint::new(f.t, f.value - b.value))
        .collect()
}

/// Windowed mean square of a residual series. See [`NoiseFloorEstimator`].
pub fn windowed_rms(residual: &[TimePoint], window_s: f64) -> TimeSeries {
    let mut estimator = NoiseFloorEstimator::new(window_s);
    residual
        .iter()
        .map(|p| TimePoint::new(p.t, estimator.update(p.t, p.value)))
        .collect()
}
