//! JSON step report.
//!
//! Structured output for downstream consumers of a counted recording:
//! - **Summary**: step count, duration, mean cadence
//! - **Steps**: accepted and revoked steps with their cadence
//! - **Crossings** (optional): interpolated threshold crossings for plotting
//!   or re-analysis
//!
//! The report is self-contained: it carries the configuration it was
//! produced with, so a stored report can be reproduced.

use serde::{Deserialize, Serialize};

use crate::config::StepCounterConfig;
use crate::error::Result;
use crate::types::{StepCountResult, TimePoint};

/// Complete report for one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Free-form source label, usually the input file name.
    pub source: String,
    pub summary: ReportSummary,
    pub steps: Vec<StepExport>,
    pub revoked_steps: Vec<StepExport>,
    /// Present only when built with [`StepReportBuilder::with_crossings`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossings: Option<CrossingsExport>,
    pub config: StepCounterConfig,
}

/// Report summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub sample_count: usize,
    pub duration_s: f64,
    pub step_count: usize,
    pub revoked_count: usize,
    /// Mean cadence in Hz over steps that had one; 0 if none.
    pub mean_cadence_hz: f64,
    /// Steps per minute over the whole recording.
    pub steps_per_minute: f64,
}

/// One step for export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepExport {
    pub index: usize,
    pub t: f64,
    pub magnitude: f64,
    /// Cadence recorded when the step was accepted. Absent for revoked steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_hz: Option<f64>,
}

/// Interpolated crossing instants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossingsExport {
    pub positive: Vec<TimePoint>,
    pub negative: Vec<TimePoint>,
}

impl StepReport {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Export only the summary.
    pub fn summary_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.summary)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// REPORT BUILDER
// ============================================================================

/// Builds a report from a pipeline result.
pub struct StepReportBuilder<'a> {
    result: &'a StepCountResult,
    config: &'a StepCounterConfig,
    source: String,
    sample_count: usize,
    duration_s: f64,
    include_crossings: bool,
}

impl<'a> StepReportBuilder<'a> {
    pub fn new(result: &'a StepCountResult, config: &'a StepCounterConfig) -> Self {
        Self {
            result,
            config,
            source: String::new(),
            sample_count: 0,
            duration_s: 0.0,
            include_crossings: false,
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sample count and duration of the recording the result came from.
    pub fn recording(mut self, sample_count: usize, duration_s: f64) -> Self {
        self.sample_count = sample_count;
        self.duration_s = duration_s;
        self
    }

    pub fn with_crossings(mut self) -> Self {
        self.include_crossings = true;
        self
    }

    pub fn build(self) -> StepReport {
        let result = self.result;

        let steps = result
            .accepted_steps
            .iter()
            .zip(&result.cadence_series)
            .map(|(step, cadence)| StepExport {
                index: step.index,
                t: step.t,
                magnitude: step.magnitude,
                cadence_hz: Some(cadence.value),
            })
            .collect();
        let revoked_steps = result
            .revoked_steps
            .iter()
            .map(|step| StepExport {
                index: step.index,
                t: step.t,
                magnitude: step.magnitude,
                cadence_hz: None,
            })
            .collect();

        let steps_per_minute = if self.duration_s > 0.0 {
            result.step_count as f64 * 60.0 / self.duration_s
        } else {
            0.0
        };

        let crossings = self.include_crossings.then(|| CrossingsExport {
            positive: result.positive_points(),
            negative: result.negative_points(),
        });

        StepReport {
            source: self.source,
            summary: ReportSummary {
                sample_count: self.sample_count,
                duration_s: self.duration_s,
                step_count: result.step_count,
                revoked_count: result.revoked_steps.len(),
                mean_cadence_hz: result.mean_cadence(),
                steps_per_minute,
            },
            steps,
            revoked_steps,
            crossings,
            config: self.config.clone(),
        }
    }
}
