//! Central job orchestrator.
//!
//! Sequences a single job: allocate its output path, marshal the worker
//! arguments, run the worker, then read the output. Held in
//! [`AppState`](crate::state::AppState) as an `Arc<JobOrchestrator>`.

use std::path::PathBuf;
use std::sync::Arc;

use sigflow_core::job::{JobDescriptor, JobKind, JobParameters};
use sigflow_core::output::{self, AnalysisResult};
use sigflow_core::staging::{JobFile, UploadStore};
use sigflow_core::worker::JobRunner;

use crate::error::AppResult;

/// Runs jobs against the external worker.
///
/// Lifecycle of [`execute`](Self::execute):
/// 1. Reserve a unique output path.
/// 2. Build the job descriptor (validates parameters).
/// 3. Spawn the worker and wait for it to exit.
/// 4. Read the output file, whatever the exit code was.
pub struct JobOrchestrator {
    runner: Arc<dyn JobRunner>,
    uploads: UploadStore,
    script_path: PathBuf,
}

impl JobOrchestrator {
    pub fn new(runner: Arc<dyn JobRunner>, uploads: UploadStore, script_path: PathBuf) -> Self {
        Self {
            runner,
            uploads,
            script_path,
        }
    }

    /// Store used for staging uploads of this orchestrator's jobs.
    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Run one `kind` job over `input` and return the worker's output.
    ///
    /// The exit code is logged but never decides the outcome: a missing
    /// output file is the failure signal.
    #[tracing::instrument(skip_all, fields(kind = %kind, input = %input.path().display()))]
    pub async fn execute(
        &self,
        kind: JobKind,
        params: &JobParameters,
        input: &JobFile,
    ) -> AppResult<AnalysisResult> {
        // 1. Reserve output path. Dropped (and removed) once the result is read.
        let output = self.uploads.allocate_output(kind).await?;

        // 2. Marshal worker arguments.
        let job = JobDescriptor::build(
            kind,
            params,
            &self.script_path,
            input.path(),
            output.path(),
        )?;

        // 3. Run the worker to completion.
        let run = self.runner.run(&job).await?;
        if !run.succeeded() {
            tracing::warn!(
                exit_code = ?run.exit_code,
                "Worker exited unsuccessfully, reading output anyway"
            );
        }

        // 4. Read the result.
        let result = output::read_output(output.path()).await?;
        tracing::info!(
            exit_code = ?run.exit_code,
            duration_ms = run.duration_ms,
            bytes = result.raw().len(),
            "Job completed"
        );
        Ok(result)
    }
}
