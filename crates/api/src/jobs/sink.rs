//! Result delivery: download pass-through or persistence.

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sigflow_core::output::AnalysisResult;
use sigflow_core::record::NewAnalysisRecord;
use sigflow_core::types::DbId;
use sigflow_db::AnalysisStore;

use crate::error::{AppError, AppResult};

/// Send the worker output back untouched as a JSON attachment.
pub fn download(file_name: &str, result: AnalysisResult) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        result.into_raw(),
    )
        .into_response()
}

/// Insert `record` and return its generated id.
pub async fn persist(store: &dyn AnalysisStore, record: NewAnalysisRecord) -> AppResult<DbId> {
    let kind = record.kind();
    let id = store.insert(&record).await.map_err(AppError::Insert)?;
    tracing::info!(id, ?kind, "Persisted analysis record");
    Ok(id)
}
