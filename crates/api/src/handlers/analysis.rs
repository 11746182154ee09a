//! Analysis job endpoints.
//!
//! Every job request follows the same order: validate, stage, run, read,
//! deliver. Validation failures are answered before anything touches disk or
//! spawns a worker.

use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use serde_json::Value;
use sigflow_core::error::CoreError;
use sigflow_core::job::{JobKind, JobParameters};
use sigflow_core::output::AnalysisResult;
use sigflow_core::record::{AnalysisRecord, NewAnalysisRecord, RecordKind};
use sigflow_core::staging::JobFile;

use crate::error::{AppError, AppResult};
use crate::handlers::form::UploadForm;
use crate::jobs::sink;
use crate::response::PersistedResponse;
use crate::state::AppState;

/// Entity name reported when no record exists yet.
const ANALYSIS_ENTITY: &str = "analysis data";

/// POST /api/transform-data
///
/// Multipart: `file`, `selectedOption`, `filterSize`, `windowType`,
/// `overlap`. Responds with the worker output as
/// `<selectedOption>-transformed.json`.
pub async fn transform_data(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = UploadForm::read(multipart).await?;
    let (params, result) = run_upload_job(&state, JobKind::Transform, form).await?;

    if state.config.persist_transform_results {
        persist_transform_result(&state, &result).await;
    }

    Ok(download(JobKind::Transform, &params, result))
}

/// POST /api/filter
///
/// Multipart: `file`, `filterType`, `order`, `cutIn`, `cutOut` and optional
/// `sampleRate`. Responds with the worker output as
/// `<filterType>-filtered.json`; 400 if a required field is missing.
pub async fn filter(State(state): State<AppState>, multipart: Multipart) -> AppResult<Response> {
    let form = UploadForm::read(multipart).await?;
    let (params, result) = run_upload_job(&state, JobKind::Filter, form).await?;
    Ok(download(JobKind::Filter, &params, result))
}

/// GET /run-fft
///
/// Runs the FFT job over the fixed server-side input file and persists the
/// result. Responds with `{ success, id }`.
pub async fn run_fft(State(state): State<AppState>) -> AppResult<Json<PersistedResponse>> {
    let input = JobFile::persistent(&state.config.worker.fft_input);
    let result = state
        .orchestrator
        .execute(JobKind::RunFft, &JobParameters::new(), &input)
        .await?;

    // Shape check happens before the store is touched.
    let payload = result.fft_payload()?;
    let id = sink::persist(state.store.as_ref(), payload.into()).await?;

    Ok(Json(PersistedResponse::created(id)))
}

/// GET /api/get-analysis-data
///
/// Returns the `analysis_data` document of the most recent analysis record.
pub async fn get_analysis_data(State(state): State<AppState>) -> AppResult<Json<Value>> {
    match latest(&state, RecordKind::Simple).await? {
        AnalysisRecord::Simple { analysis_data, .. } => Ok(Json(analysis_data)),
        other => Err(AppError::InternalError(format!(
            "Store returned a {:?} record for a simple lookup",
            other.kind()
        ))),
    }
}

/// GET /api/get-fft-data
///
/// Returns the most recent FFT record as `{ id, sampling_frequency, fft_data }`.
pub async fn get_fft_data(State(state): State<AppState>) -> AppResult<Json<AnalysisRecord>> {
    let record = latest(&state, RecordKind::Fft).await?;
    Ok(Json(record))
}

/// Validate, stage and run an upload-backed job.
async fn run_upload_job(
    state: &AppState,
    kind: JobKind,
    mut form: UploadForm,
) -> AppResult<(JobParameters, AnalysisResult)> {
    kind.validate(&form.fields)?;
    let upload = form.require_file()?;

    let input = state
        .orchestrator
        .uploads()
        .stage(&upload.data[..], &upload.file_name)
        .await?;
    let result = state
        .orchestrator
        .execute(kind, &form.fields, &input)
        .await?;

    Ok((form.fields, result))
}

fn download(kind: JobKind, params: &JobParameters, result: AnalysisResult) -> Response {
    let file_name = kind
        .attachment_name(params)
        .unwrap_or_else(|| format!("{kind}.json"));
    sink::download(&file_name, result)
}

/// Side path for transform results. A failure here is logged and does not
/// affect the download already produced.
async fn persist_transform_result(state: &AppState, result: &AnalysisResult) {
    let analysis_data = match result.parse() {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Transform output is not JSON, skipping persistence");
            return;
        }
    };
    if let Err(e) = sink::persist(
        state.store.as_ref(),
        NewAnalysisRecord::Simple { analysis_data },
    )
    .await
    {
        tracing::error!(error = %e, "Failed to persist transform result");
    }
}

async fn latest(state: &AppState, kind: RecordKind) -> AppResult<AnalysisRecord> {
    state
        .store
        .fetch_latest(kind)
        .await
        .map_err(AppError::Retrieve)?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: ANALYSIS_ENTITY,
        }))
}
