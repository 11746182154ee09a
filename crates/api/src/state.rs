use std::sync::Arc;

use sigflow_db::AnalysisStore;

use crate::config::ServerConfig;
use crate::jobs::JobOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Persistence gateway, backed by the process-wide connection pool.
    pub store: Arc<dyn AnalysisStore>,
    /// Runs jobs against the external worker.
    pub orchestrator: Arc<JobOrchestrator>,
}
