use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sigflow_core::staging::UploadStore;
use sigflow_core::worker::ProcessRunner;
use sigflow_db::PgAnalysisStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sigflow_api::config::{DatabaseConfig, ServerConfig};
use sigflow_api::jobs::JobOrchestrator;
use sigflow_api::router::build_app_router;
use sigflow_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "sigflow_api=debug,sigflow_core=debug,sigflow_db=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    // LOG_FORMAT=json for log shippers; human-readable otherwise.
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        interpreter = %config.worker.interpreter,
        script = %config.worker.script_path.display(),
        "Loaded server configuration"
    );
    let db_config = DatabaseConfig::from_env()
        .context("DATABASE_URL (or DB_USER and DB_DATABASE) must be set")?;

    // --- Database ---
    let pool = sigflow_db::create_pool(&db_config.url, db_config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    sigflow_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    sigflow_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Job pipeline ---
    // Cancelled on shutdown so in-flight workers are killed instead of
    // holding the server open.
    let shutdown = CancellationToken::new();
    let runner = ProcessRunner::new(
        config.worker.interpreter.clone(),
        Duration::from_secs(config.worker.timeout_secs),
        shutdown.clone(),
    );
    let uploads = UploadStore::new(
        config.storage.upload_dir.clone(),
        config.storage.output_dir.clone(),
        config.storage.retain_job_files,
    );
    if config.storage.retain_job_files {
        tracing::warn!("RETAIN_JOB_FILES is set, staged uploads and outputs will accumulate");
    }
    let orchestrator = JobOrchestrator::new(
        Arc::new(runner),
        uploads,
        config.worker.script_path.clone(),
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(PgAnalysisStore::new(pool.clone())),
        orchestrator: Arc::new(orchestrator),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal, then cancel in-flight worker runs.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    shutdown.cancel();
}
