//! The [`JobRunner`] seam and its process-spawning implementation.

use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::subprocess;
use crate::job::JobDescriptor;

/// Record of one finished worker process.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRun {
    /// OS process id, when the platform reported one.
    pub pid: Option<u32>,
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Everything the worker wrote to stdout (capped).
    pub stdout: String,
    /// Everything the worker wrote to stderr (capped).
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ProcessRun {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failures of the process itself. A worker that ran and exited, with any
/// code, is not a failure.
#[derive(Debug)]
pub enum WorkerError {
    /// The worker program could not be started.
    Spawn { program: String, source: io::Error },
    /// Waiting on the running child failed.
    Wait(io::Error),
    /// The worker outlived its deadline and was killed.
    Timeout { elapsed_ms: u64 },
    /// The run was cancelled (server shutdown) and the worker was killed.
    Cancelled,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "Failed to spawn worker '{program}': {source}")
            }
            Self::Wait(err) => write!(f, "Failed waiting on worker: {err}"),
            Self::Timeout { elapsed_ms } => write!(f, "Worker timed out after {elapsed_ms}ms"),
            Self::Cancelled => f.write_str("Worker run was cancelled"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Wait(err) => Some(err),
            _ => None,
        }
    }
}

/// Runs one [`JobDescriptor`] to completion.
///
/// Implementations must start exactly one worker per call and resolve only
/// once it has exited.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &JobDescriptor) -> Result<ProcessRun, WorkerError>;
}

/// Spawns `program` with the descriptor's argument vector.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ProcessRunner {
    /// `program` is the interpreter or executable; the script path is already
    /// the first element of every descriptor's arguments. `cancel` is
    /// usually the server's shutdown token.
    pub fn new(program: impl Into<String>, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            program: program.into(),
            timeout,
            cancel,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl JobRunner for ProcessRunner {
    async fn run(&self, job: &JobDescriptor) -> Result<ProcessRun, WorkerError> {
        tracing::debug!(
            kind = %job.kind,
            program = %self.program,
            args = ?job.arguments,
            "Starting worker"
        );
        let mut cmd = Command::new(&self.program);
        cmd.args(&job.arguments);
        subprocess::run_command(&mut cmd, self.timeout, &self.cancel).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
