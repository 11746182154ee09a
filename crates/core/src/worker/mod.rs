//! External worker invocation.
//!
//! One job is one child process. [`runner::ProcessRunner`] is the production
//! [`runner::JobRunner`]; the subprocess plumbing (spawn, stream draining,
//! deadline, cancellation) lives in [`subprocess`].

pub mod runner;
pub mod subprocess;

pub use runner::{JobRunner, ProcessRun, ProcessRunner, WorkerError};

/// Shared helpers for tests that need a throwaway worker program.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::io::Write;

    /// Write `body` to a temporary bash script. Run it with `bash <path>`.
    pub fn write_stub(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp file");
        writeln!(f, "#!/bin/bash").expect("write shebang");
        write!(f, "{body}").expect("write body");
        f
    }
}
