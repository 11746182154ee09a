//! Persisted analysis results.
//!
//! One logical entity stored in two shapes: free-form analysis JSON, and FFT
//! output with its sampling frequency split out.

use serde::Serialize;
use serde_json::Value;

use crate::output::FftPayload;
use crate::types::DbId;

/// Which persisted shape a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Simple,
    Fft,
}

/// A record not yet written; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub enum NewAnalysisRecord {
    Simple { analysis_data: Value },
    Fft { sampling_frequency: f64, fft_data: Value },
}

impl NewAnalysisRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Simple { .. } => RecordKind::Simple,
            Self::Fft { .. } => RecordKind::Fft,
        }
    }
}

impl From<FftPayload> for NewAnalysisRecord {
    fn from(payload: FftPayload) -> Self {
        Self::Fft {
            sampling_frequency: payload.sampling_frequency,
            fft_data: payload.data,
        }
    }
}

/// A stored record. Ids are assigned by the store and increase
/// monotonically, so the highest id is the latest record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisRecord {
    Simple {
        id: DbId,
        analysis_data: Value,
    },
    Fft {
        id: DbId,
        sampling_frequency: f64,
        fft_data: Value,
    },
}

impl AnalysisRecord {
    pub fn id(&self) -> DbId {
        match self {
            Self::Simple { id, .. } | Self::Fft { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Simple { .. } => RecordKind::Simple,
            Self::Fft { .. } => RecordKind::Fft,
        }
    }

    /// Attach a store-assigned id to a new record.
    pub fn from_new(id: DbId, record: NewAnalysisRecord) -> Self {
        match record {
            NewAnalysisRecord::Simple { analysis_data } => Self::Simple { id, analysis_data },
            NewAnalysisRecord::Fft {
                sampling_frequency,
                fft_data,
            } => Self::Fft {
                id,
                sampling_frequency,
                fft_data,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fft_record_serializes_flat() {
        let record = AnalysisRecord::from_new(
            7,
            NewAnalysisRecord::from(FftPayload {
                sampling_frequency: 44100.0,
                data: json!([1, 2]),
            }),
        );
        assert_eq!(record.id(), 7);
        assert_eq!(record.kind(), RecordKind::Fft);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": 7, "sampling_frequency": 44100.0, "fft_data": [1, 2]})
        );
    }
}
