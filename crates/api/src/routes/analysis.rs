use axum::routing::{get, post};
use axum::Router;

use crate::handlers::analysis;
use crate::state::AppState;

/// Routes mounted under `/api`.
///
/// ```text
/// POST /transform-data       upload + transform, JSON attachment
/// POST /filter               upload + filter, JSON attachment
/// GET  /get-analysis-data    latest analysis document
/// GET  /get-fft-data         latest FFT record
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transform-data", post(analysis::transform_data))
        .route("/filter", post(analysis::filter))
        .route("/get-analysis-data", get(analysis::get_analysis_data))
        .route("/get-fft-data", get(analysis::get_fft_data))
}

/// Routes mounted at the root.
///
/// ```text
/// GET /run-fft               FFT over the fixed input, persisted
/// ```
pub fn root_router() -> Router<AppState> {
    Router::new().route("/run-fft", get(analysis::run_fft))
}
