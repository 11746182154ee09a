//! Liveness and readiness of the gateway's two collaborators: the database
//! and the external worker.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when any check below fails.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub worker: WorkerHealth,
}

/// What a job run would spawn, and whether the pieces are on disk.
#[derive(Serialize)]
pub struct WorkerHealth {
    pub interpreter: String,
    pub script_present: bool,
    pub fft_input_present: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let worker = &state.config.worker;
    let worker = WorkerHealth {
        interpreter: worker.interpreter.clone(),
        script_present: tokio::fs::try_exists(&worker.script_path)
            .await
            .unwrap_or(false),
        fft_input_present: tokio::fs::try_exists(&worker.fft_input)
            .await
            .unwrap_or(false),
    };

    let healthy = db_healthy && worker.script_present;
    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        worker,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
