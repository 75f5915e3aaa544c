//! Step Sensing Engine Library
//!
//! Converts a stream of tri-axial accelerometer samples (g-units) into a
//! validated step count: conditioning filters feed an adaptive threshold, a
//! geometric crossing detector finds sub-sample threshold crossings, and a
//! rule-gated state machine decides which crossings are plausible steps,
//! including retroactive revocation of the most recent one.
//!
//! # Design Philosophy
//!
//! - **Causal and bounded**: every filter looks back only, over a fixed
//!   buffer. Batch and streaming runs produce identical results.
//! - **Input is trusted, configuration is not**: samples are assumed ordered
//!   and in g; the configuration is validated once, up front.
//! - **Explainable decisions**: every arm, rejection, stale reset and
//!   revocation is observable as a [`ValidatorEvent`].
//!
//! # Example
//!
//! ```
//! use step_sensing::{count_steps, Sample, StepCounterConfig};
//!
//! // Two seconds of a phone lying flat at 50 Hz.
//! let samples: Vec<Sample> = (0..100)
//!     .map(|i| Sample::new(i * 20_000_000, 0.0, 0.0, 1.0))
//!     .collect();
//!
//! let result = count_steps(&samples, &StepCounterConfig::default()).unwrap();
//! assert_eq!(result.step_count, 0);
//! ```

pub mod cadence;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod signal;
pub mod step_detection;
pub mod threshold;
pub mod types;

#[cfg(feature = "csv")]
pub mod csv_io;
#[cfg(feature = "serde")]
pub mod export;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use config::{StepCounterConfig, ThresholdBaseline};
pub use error::{Result, StepError};
pub use pipeline::{condition, count_steps, ConditionedSignals, StepCounter};
pub use step_detection::{validate_steps, StepValidator, ValidatorState};
pub use types::{
    AcceptedStep, ConditionedSample, CrossingDirection, CrossingEvent, RejectReason, Sample,
    StepCountResult, TimePoint, TimeSeries, ValidatorEvent,
};
