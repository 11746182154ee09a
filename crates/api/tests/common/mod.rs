//! Shared harness for API integration tests.
//!
//! Each [`TestApp`] owns a temporary directory holding the worker stub, the
//! staging directories and the fixed FFT input. The worker is a bash script
//! run through the real [`ProcessRunner`], wrapped in a [`SpyRunner`] that
//! records every descriptor it is handed. Persistence goes to a
//! [`MemoryStore`].

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sigflow_api::config::{ServerConfig, StorageConfig, WorkerConfig};
use sigflow_api::jobs::JobOrchestrator;
use sigflow_api::router::build_app_router;
use sigflow_api::state::AppState;
use sigflow_core::job::JobDescriptor;
use sigflow_core::record::{AnalysisRecord, NewAnalysisRecord, RecordKind};
use sigflow_core::staging::UploadStore;
use sigflow_core::types::DbId;
use sigflow_core::worker::{JobRunner, ProcessRun, ProcessRunner, WorkerError};
use sigflow_db::AnalysisStore;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const BOUNDARY: &str = "sigflow-test-boundary";

/// Worker stub that copies its input to its output (token-carrying jobs).
pub const ECHO_WORKER: &str = "cp \"$2\" \"$3\"\n";

// ---------------------------------------------------------------------------
// In-memory persistence
// ---------------------------------------------------------------------------

/// [`AnalysisStore`] keeping records in a vector. Ids start at 1.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AnalysisRecord>>,
    insert_calls: AtomicUsize,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<AnalysisRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn insert(&self, record: &NewAnalysisRecord) -> Result<DbId, sqlx::Error> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut records = self.records.lock().unwrap();
        let id = records.len() as DbId + 1;
        records.push(AnalysisRecord::from_new(id, record.clone()));
        Ok(id)
    }

    async fn fetch_latest(&self, kind: RecordKind) -> Result<Option<AnalysisRecord>, sqlx::Error> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.kind() == kind)
            .max_by_key(|r| r.id())
            .cloned())
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Spy runner
// ---------------------------------------------------------------------------

/// Delegates to a real [`ProcessRunner`] and records each job it runs.
pub struct SpyRunner {
    inner: ProcessRunner,
    jobs: Mutex<Vec<JobDescriptor>>,
}

impl SpyRunner {
    pub fn calls(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn jobs(&self) -> Vec<JobDescriptor> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRunner for SpyRunner {
    async fn run(&self, job: &JobDescriptor) -> Result<ProcessRun, WorkerError> {
        self.jobs.lock().unwrap().push(job.clone());
        self.inner.run(job).await
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub config: ServerConfig,
    pub store: Arc<MemoryStore>,
    pub runner: Arc<SpyRunner>,
    pub shutdown: CancellationToken,
    state: AppState,
}

impl TestApp {
    /// Build an app whose worker is a bash script with `worker_body`.
    pub fn new(worker_body: &str) -> Self {
        Self::with_config(worker_body, |_| {})
    }

    /// Like [`TestApp::new`], letting the test adjust the config first.
    pub fn with_config(worker_body: &str, adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");

        let script = dir.path().join("worker.sh");
        let mut f = std::fs::File::create(&script).expect("create worker stub");
        writeln!(f, "#!/bin/bash").expect("write shebang");
        write!(f, "{worker_body}").expect("write worker body");

        let fft_input = dir.path().join("raw.tsv");
        std::fs::write(&fft_input, "0\t0.5\n1\t0.25\n").expect("write fft input");

        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["http://localhost:5173".to_string()],
            request_timeout_secs: 30,
            max_upload_bytes: 10 * 1024 * 1024,
            persist_transform_results: false,
            worker: WorkerConfig {
                interpreter: "bash".to_string(),
                script_path: script,
                timeout_secs: 10,
                fft_input,
            },
            storage: StorageConfig {
                upload_dir: dir.path().join("uploads"),
                output_dir: dir.path().join("outputs"),
                retain_job_files: false,
            },
        };
        adjust(&mut config);

        let shutdown = CancellationToken::new();
        let runner = Arc::new(SpyRunner {
            inner: ProcessRunner::new(
                config.worker.interpreter.clone(),
                Duration::from_secs(config.worker.timeout_secs),
                shutdown.clone(),
            ),
            jobs: Mutex::new(Vec::new()),
        });
        let uploads = UploadStore::new(
            config.storage.upload_dir.clone(),
            config.storage.output_dir.clone(),
            config.storage.retain_job_files,
        );
        let orchestrator = JobOrchestrator::new(
            runner.clone(),
            uploads,
            config.worker.script_path.clone(),
        );
        let store = Arc::new(MemoryStore::default());

        let state = AppState {
            config: Arc::new(config.clone()),
            store: store.clone(),
            orchestrator: Arc::new(orchestrator),
        };

        Self {
            dir,
            config,
            store,
            runner,
            shutdown,
            state,
        }
    }

    /// A fresh router over this app's shared state.
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone(), &self.config)
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.router().oneshot(request).await.unwrap()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.storage.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.storage.output_dir
    }
}

/// The `file` part of a form post.
pub fn upload<'a>(file_name: &'a str, data: &'a [u8]) -> Option<(&'a str, &'a [u8])> {
    Some((file_name, data))
}

/// Encode a `multipart/form-data` body with [`BOUNDARY`].
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({e}): {}",
            String::from_utf8_lossy(&bytes)
        )
    })
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing {name} header"))
        .to_str()
        .unwrap()
}

/// Files currently in `dir` (empty if the directory does not exist).
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
