//! Models for the `fft_results` and `fft_results_1` tables.

use serde::Serialize;
use sigflow_core::record::AnalysisRecord;
use sigflow_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row of `fft_results`: an opaque analysis document.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnalysisRow {
    pub id: DbId,
    pub analysis_data: serde_json::Value,
    pub created_at: Timestamp,
}

/// A row of `fft_results_1`: FFT output with its sampling frequency.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FftResultRow {
    pub id: DbId,
    pub sampling_frequency: f64,
    pub fft_data: serde_json::Value,
    pub created_at: Timestamp,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        AnalysisRecord::Simple {
            id: row.id,
            analysis_data: row.analysis_data,
        }
    }
}

impl From<FftResultRow> for AnalysisRecord {
    fn from(row: FftResultRow) -> Self {
        AnalysisRecord::Fft {
            id: row.id,
            sampling_frequency: row.sampling_frequency,
            fft_data: row.fft_data,
        }
    }
}
