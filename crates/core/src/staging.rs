//! Temporary file store for uploads and worker output paths.
//!
//! Every staged upload and every allocated output path gets a unique,
//! timestamp-prefixed name so concurrent jobs of the same kind never share a
//! file. Paths are handed out as [`JobFile`] guards which remove the file on
//! drop unless the store was configured to retain job files.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::job::JobKind;

/// Errors raised while staging an upload or preparing an output location.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("failed to create staging directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write staged file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// A file path owned by one job.
///
/// When `remove_on_drop` is set the file is deleted as soon as the guard goes
/// out of scope, whichever way the request ends.
#[derive(Debug)]
pub struct JobFile {
    path: PathBuf,
    remove_on_drop: bool,
}

impl JobFile {
    /// Wrap a path that must never be deleted (e.g. the fixed FFT input).
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remove_on_drop: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JobFile {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed job file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove job file")
            }
        }
    }
}

/// Directory-backed store for staged uploads and worker outputs.
#[derive(Debug, Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
    retain_files: bool,
}

impl UploadStore {
    /// Create a store. With `retain_files` set, nothing it hands out is ever
    /// deleted.
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        retain_files: bool,
    ) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
            retain_files,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the full `upload` under a fresh name derived from
    /// `original_name` and return its guard.
    ///
    /// The file is opened with `create_new`, so an existing file is never
    /// overwritten.
    pub async fn stage<R>(&self, mut upload: R, original_name: &str) -> Result<JobFile, StagingError>
    where
        R: AsyncRead + Unpin,
    {
        ensure_dir(&self.upload_dir).await?;

        let path = self
            .upload_dir
            .join(format!("{}-{}", unique_prefix(), sanitize_name(original_name)));
        let write_err = |source| StagingError::Write {
            path: path.clone(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(write_err)?;
        // Guard before writing so a partial upload is cleaned up too.
        let staged = self.guard(path.clone());

        let written = tokio::io::copy(&mut upload, &mut file)
            .await
            .map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        tracing::debug!(path = %path.display(), bytes = written, "Staged upload");
        Ok(staged)
    }

    /// Reserve a unique output path for one run of `kind`. The file itself is
    /// created by the worker.
    pub async fn allocate_output(&self, kind: JobKind) -> Result<JobFile, StagingError> {
        ensure_dir(&self.output_dir).await?;
        let path = self
            .output_dir
            .join(format!("{}-{}-output.json", unique_prefix(), kind.label()));
        Ok(self.guard(path))
    }

    fn guard(&self, path: PathBuf) -> JobFile {
        JobFile {
            path,
            remove_on_drop: !self.retain_files,
        }
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), StagingError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| StagingError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// `<unix millis>-<8 hex chars>`: sorts by arrival, unique within a millisecond.
fn unique_prefix() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &nonce[..8])
}

/// Reduce a client-supplied file name to its final component with a safe
/// character set.
fn sanitize_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
