use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sigflow_core::error::CoreError;
use sigflow_core::output::{OutputError, INVALID_STRUCTURE_MESSAGE, READ_ERROR_MESSAGE};
use sigflow_core::staging::StagingError;
use sigflow_core::worker::WorkerError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of each pipeline stage and implements
/// [`IntoResponse`] to produce `{ "error": <message> }` bodies. Server-side
/// failures are logged with full detail and answered with a fixed message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sigflow_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The upload could not be written to the staging directory.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// The worker process could not be run to completion.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The worker's output file was missing, unreadable or malformed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Inserting a record failed.
    #[error("Insert failed: {0}")]
    Insert(#[source] sqlx::Error),

    /// Reading a record failed.
    #[error("Select failed: {0}")]
    Retrieve(#[source] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Status code and client-facing message for this error.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity } => {
                    (StatusCode::NOT_FOUND, format!("No {entity} found"))
                }
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Internal(_) => internal("An internal error occurred"),
            },
            AppError::Staging(_) => internal("Error storing the uploaded file"),
            AppError::Worker(WorkerError::Timeout { .. }) => internal("Analysis worker timed out"),
            AppError::Worker(_) => internal("Error running the analysis worker"),
            AppError::Output(OutputError::Read { .. }) => internal(READ_ERROR_MESSAGE),
            AppError::Output(OutputError::Parse(_)) => {
                internal("Error parsing the output JSON file")
            }
            AppError::Output(OutputError::InvalidStructure) => (
                StatusCode::BAD_REQUEST,
                INVALID_STRUCTURE_MESSAGE.to_string(),
            ),
            AppError::Insert(_) => internal("Error inserting data into PostgreSQL"),
            AppError::Retrieve(_) => internal("Error retrieving data from PostgreSQL"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(_) => internal("An internal error occurred"),
        }
    }
}

fn internal(message: &str) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
