//! Reading what the worker leaves at its output path.
//!
//! The output file is the only success signal a worker gives: a run that
//! exits non-zero but writes the file succeeded, and a clean exit without the
//! file failed.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Message surfaced when the output file is missing or unreadable.
pub const READ_ERROR_MESSAGE: &str = "Error reading the output JSON file";

/// Message surfaced when FFT output lacks its required fields.
pub const INVALID_STRUCTURE_MESSAGE: &str = "Invalid data structure";

/// Top-level key holding the FFT sampling frequency in worker output.
pub const SAMPLING_FREQUENCY_KEY: &str = "Sampling_frequency";

/// Top-level key holding the FFT data in worker output.
pub const DATA_KEY: &str = "data";

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Error reading the output JSON file: {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Error parsing the output JSON file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid data structure")]
    InvalidStructure,
}

/// Raw worker output, kept as text so it can be passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    raw: String,
}

impl AnalysisResult {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Parse the text as JSON on demand.
    pub fn parse(&self) -> Result<Value, OutputError> {
        Ok(serde_json::from_str(&self.raw)?)
    }

    /// Parse and check the FFT output shape
    /// (`{ "data": ..., "Sampling_frequency": <number or numeric string> }`).
    pub fn fft_payload(&self) -> Result<FftPayload, OutputError> {
        FftPayload::from_value(self.parse()?)
    }
}

/// Validated FFT worker output, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct FftPayload {
    pub sampling_frequency: f64,
    pub data: Value,
}

impl FftPayload {
    /// Both keys must be present and set. `data` counts as missing when it is
    /// `null`, `false`, `0` or `""`. The sampling frequency may be a number or
    /// a numeric string, and must be non-zero and finite.
    pub fn from_value(mut value: Value) -> Result<Self, OutputError> {
        let sampling_frequency = value
            .get(SAMPLING_FREQUENCY_KEY)
            .and_then(frequency)
            .ok_or(OutputError::InvalidStructure)?;

        let data = value
            .get_mut(DATA_KEY)
            .map(Value::take)
            .filter(is_set)
            .ok_or(OutputError::InvalidStructure)?;

        Ok(Self {
            sampling_frequency,
            data,
        })
    }
}

fn frequency(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (f != 0.0 && f.is_finite()).then_some(f)
}

/// Empty arrays and objects still count as set.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Read the worker's output file in full.
pub async fn read_output(path: &Path) -> Result<AnalysisResult, OutputError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| OutputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), bytes = raw.len(), "Read worker output");
    Ok(AnalysisResult::from_raw(raw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
