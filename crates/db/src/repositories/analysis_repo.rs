//! Repository for the `fft_results` and `fft_results_1` tables.

use sqlx::PgPool;
use sigflow_core::types::DbId;

use crate::models::analysis::{AnalysisRow, FftResultRow};

/// Column list for `fft_results` SELECT queries.
const ANALYSIS_COLUMNS: &str = "id, analysis_data, created_at";

/// Column list for `fft_results_1` SELECT queries.
const FFT_COLUMNS: &str = "id, sampling_frequency, fft_data, created_at";

/// Inserts and latest-row lookups for both analysis tables.
pub struct AnalysisRepo;

impl AnalysisRepo {
    /// Insert an analysis document, returning the generated id.
    pub async fn insert_analysis(
        pool: &PgPool,
        analysis_data: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO fft_results (analysis_data) VALUES ($1) RETURNING id")
            .bind(analysis_data)
            .fetch_one(pool)
            .await
    }

    /// Insert an FFT result, returning the generated id.
    pub async fn insert_fft(
        pool: &PgPool,
        sampling_frequency: f64,
        fft_data: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO fft_results_1 (sampling_frequency, fft_data) VALUES ($1, $2) RETURNING id",
        )
        .bind(sampling_frequency)
        .bind(fft_data)
        .fetch_one(pool)
        .await
    }

    /// The analysis document with the highest id, if any.
    pub async fn find_latest_analysis(pool: &PgPool) -> Result<Option<AnalysisRow>, sqlx::Error> {
        let query = format!("SELECT {ANALYSIS_COLUMNS} FROM fft_results ORDER BY id DESC LIMIT 1");
        sqlx::query_as::<_, AnalysisRow>(&query)
            .fetch_optional(pool)
            .await
    }

    /// The FFT result with the highest id, if any.
    pub async fn find_latest_fft(pool: &PgPool) -> Result<Option<FftResultRow>, sqlx::Error> {
        let query = format!("SELECT {FFT_COLUMNS} FROM fft_results_1 ORDER BY id DESC LIMIT 1");
        sqlx::query_as::<_, FftResultRow>(&query)
            .fetch_optional(pool)
            .await
    }
}
