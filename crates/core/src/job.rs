//! Job kinds and the positional argument contract with the external worker.
//!
//! The worker takes no named arguments. Every invocation is
//! `<script> <token?> <input> <output> <params...>` and the order of the
//! trailing parameters is fixed per [`JobKind`]. [`JobDescriptor::build`] is
//! the only place that argument vector is assembled.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;

/// Message returned when a required filter field is missing or empty.
pub const INVALID_INPUT_MESSAGE: &str = "Invalid input data";

/// Raw form fields of one request, keyed by field name.
pub type JobParameters = HashMap<String, String>;

/// The three analysis operations the gateway can hand to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Spectral transform of an uploaded file.
    Transform,
    /// Digital filter applied to an uploaded file.
    Filter,
    /// FFT over the fixed server-side input file.
    RunFft,
}

/// How a single positional parameter is treated before it is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Must be present and non-empty, otherwise the request is rejected.
    Required,
    /// Always forwarded; an absent value becomes an empty argument.
    Forwarded,
    /// Forwarded only when present and non-empty.
    Optional,
}

const TRANSFORM_PARAMS: &[(&str, Presence)] = &[
    ("selectedOption", Presence::Forwarded),
    ("filterSize", Presence::Forwarded),
    ("windowType", Presence::Forwarded),
    ("overlap", Presence::Forwarded),
];

const FILTER_PARAMS: &[(&str, Presence)] = &[
    ("filterType", Presence::Required),
    ("order", Presence::Required),
    ("cutIn", Presence::Required),
    ("cutOut", Presence::Required),
    ("sampleRate", Presence::Optional),
];

impl JobKind {
    /// Token passed to the worker as the first argument after the script
    /// path. The fixed-input FFT run is invoked without one.
    pub fn token(self) -> Option<&'static str> {
        match self {
            Self::Transform => Some("transform"),
            Self::Filter => Some("filter"),
            Self::RunFft => None,
        }
    }

    /// Short label used in log fields and generated file names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Filter => "filter",
            Self::RunFft => "run-fft",
        }
    }

    /// Ordered parameter contract for this kind.
    fn parameters(self) -> &'static [(&'static str, Presence)] {
        match self {
            Self::Transform => TRANSFORM_PARAMS,
            Self::Filter => FILTER_PARAMS,
            Self::RunFft => &[],
        }
    }

    /// Check the request fields for this kind without building anything.
    ///
    /// Only the filter job has required fields. The transform job forwards
    /// whatever it receives.
    pub fn validate(self, params: &JobParameters) -> Result<(), CoreError> {
        let missing = self
            .parameters()
            .iter()
            .filter(|(_, presence)| *presence == Presence::Required)
            .any(|(name, _)| non_empty(params, name).is_none());

        if missing {
            return Err(CoreError::Validation(INVALID_INPUT_MESSAGE.to_string()));
        }
        Ok(())
    }

    /// Download file name for the pass-through result of this job, built
    /// from its primary parameter (`<selectedOption>-transformed.json`,
    /// `<filterType>-filtered.json`). `None` for jobs that are persisted
    /// instead of downloaded.
    pub fn attachment_name(self, params: &JobParameters) -> Option<String> {
        let (field, suffix) = match self {
            Self::Transform => ("selectedOption", "transformed"),
            Self::Filter => ("filterType", "filtered"),
            Self::RunFft => return None,
        };
        let primary = params.get(field).map(String::as_str).unwrap_or_default();
        Some(format!("{}-{suffix}.json", sanitize_file_stem(primary)))
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fully validated, ready-to-spawn job.
///
/// `arguments` is the exact argument vector handed to the worker program,
/// starting with the script path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub kind: JobKind,
    pub arguments: Vec<String>,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl JobDescriptor {
    /// Validate `params` for `kind` and marshal the positional argument
    /// vector `[script, token?, input, output, ...params]`.
    ///
    /// Parameter order follows the kind's declared contract, never the order
    /// in which the fields arrived.
    pub fn build(
        kind: JobKind,
        params: &JobParameters,
        script_path: &Path,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<Self, CoreError> {
        kind.validate(params)?;

        let mut arguments = vec![path_arg(script_path)];
        if let Some(token) = kind.token() {
            arguments.push(token.to_string());
        }
        arguments.push(path_arg(input_path));
        arguments.push(path_arg(output_path));

        for (name, presence) in kind.parameters() {
            match presence {
                Presence::Required | Presence::Forwarded => {
                    let value = params.get(*name).cloned().unwrap_or_default();
                    arguments.push(value);
                }
                Presence::Optional => {
                    if let Some(value) = non_empty(params, name) {
                        arguments.push(value.to_string());
                    }
                }
            }
        }

        Ok(Self {
            kind,
            arguments,
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
        })
    }
}

fn non_empty<'a>(params: &'a JobParameters, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Keep a user-supplied value safe for a `Content-Disposition` file name.
fn sanitize_file_stem(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
