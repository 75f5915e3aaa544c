//! CSV adapters: accelerometer sample reader and conditioned-signal writer.
//!
//! The reader expects one sample per row with an integer timestamp column and
//! three consecutive axis columns. Anything the pipeline cannot use is
//! reported as [`StepError::MalformedRow`] with the 1-based data row number.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, StepError};
use crate::pipeline::ConditionedSignals;
use crate::types::Sample;

/// Column positions of a sample CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Timestamp column.
    pub time: usize,
    /// Column of the x axis; y and z follow it.
    pub x: usize,
    /// Whether the first row is a header.
    pub has_header: bool,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            time: 0,
            x: 1,
            has_header: false,
        }
    }
}

/// Read samples from any reader, keeping at most `limit` rows.
///
/// Rows are returned in file order; see [`sort_by_timestamp`].
pub fn read_samples<R: Read>(
    reader: R,
    layout: &ColumnLayout,
    limit: Option<usize>,
) -> Result<Vec<Sample>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(layout.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (i, record) in csv.records().enumerate() {
        if limit.is_some_and(|n| samples.len() >= n) {
            break;
        }
        let record = record?;
        let row = i + 1;
        samples.push(Sample {
            timestamp: timestamp_field(&record, layout.time, row)?,
            x: field(&record, layout.x, row)?,
            y: field(&record, layout.x + 1, row)?,
            z: field(&record, layout.x + 2, row)?,
        });
    }
    Ok(samples)
}

/// Open and read a sample CSV.
pub fn read_samples_from_path(
    path: impl AsRef<Path>,
    layout: &ColumnLayout,
    limit: Option<usize>,
) -> Result<Vec<Sample>> {
    let file = File::open(path)?;
    read_samples(file, layout, limit)
}

/// Stable sort by timestamp. The pipeline never reorders its input.
pub fn sort_by_timestamp(samples: &mut [Sample]) {
    samples.sort_by_key(|s| s.timestamp);
}

/// Write every conditioned series, one row per sample.
pub fn write_trace<W: Write>(writer: W, signals: &ConditionedSignals) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "index", "t", "magnitude", "filtered", "baseline", "residual", "threshold", "noise",
        "axis_x", "axis_y", "axis_z",
    ])?;
    for s in signals.samples() {
        csv.write_record([
            s.index.to_string(),
            s.t.to_string(),
            s.magnitude.to_string(),
            s.filtered.to_string(),
            s.baseline.to_string(),
            s.residual.to_string(),
            s.threshold.to_string(),
            s.noise.to_string(),
            s.axes[0].to_string(),
            s.axes[1].to_string(),
            s.axes[2].to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

fn raw_field<'r>(record: &'r csv::StringRecord, column: usize, row: usize) -> Result<&'r str> {
    record.get(column).ok_or_else(|| StepError::MalformedRow {
        row,
        reason: format!("missing column {column}"),
    })
}

fn field<T: FromStr>(record: &csv::StringRecord, column: usize, row: usize) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = raw_field(record, column, row)?;
    raw.parse().map_err(|e| StepError::MalformedRow {
        row,
        reason: format!("column {column} `{raw}`: {e}"),
    })
}

/// Integer timestamps, or whole-number floats such as `1.5e9`.
fn timestamp_field(record: &csv::StringRecord, column: usize, row: usize) -> Result<i64> {
    let raw = raw_field(record, column, row)?;
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        _ => Err(StepError::MalformedRow {
            row,
            reason: format!("column {column} `{raw}` is not an integer timestamp"),
        }),
    }
}
