//! Spawn-and-supervise logic for worker processes.
//!
//! [`run_command`] spawns the prepared command in its own process group,
//! drains stdout and stderr concurrently (logging every line as it arrives),
//! and waits for exit under a deadline and a cancellation token. Output
//! streams are diagnostics only; job results travel through the output file.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::runner::{ProcessRun, WorkerError};

/// Maximum stdout or stderr size kept per stream (10 MiB).
///
/// Lines past the limit are still logged, just not accumulated.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How long a drain task may take to hit EOF once its process group is dead.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Log target for worker stdout lines.
pub const STDOUT_TARGET: &str = "worker_stdout";

/// Log target for worker stderr lines.
pub const STDERR_TARGET: &str = "worker_stderr";

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Spawn `cmd`, capture its output streams and wait for it to exit.
///
/// The deadline covers the whole run, including draining the output pipes:
/// a worker that exits while a descendant still holds stdout or stderr open
/// has its process group killed at the deadline. The child is also killed
/// when `cancel` fires or when the returned future is dropped
/// (`kill_on_drop`). A non-zero exit status is not an error here; it is
/// reported through [`ProcessRun::exit_code`].
pub async fn run_command(
    cmd: &mut Command,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ProcessRun, WorkerError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + timeout;

    let mut child = cmd.spawn().map_err(|source| WorkerError::Spawn {
        program: program.clone(),
        source,
    })?;
    let pid = child.id();
    tracing::info!(?pid, %program, "Worker process spawned");

    let mut stdout_task = tokio::spawn(drain(child.stdout.take(), Stream::Stdout, pid));
    let mut stderr_task = tokio::spawn(drain(child.stderr.take(), Stream::Stderr, pid));

    let status = tokio::select! {
        status = child.wait() => status.map_err(WorkerError::Wait),
        () = tokio::time::sleep_until(deadline) => {
            let elapsed_ms = elapsed_ms(start);
            tracing::error!(?pid, elapsed_ms, "Worker exceeded its deadline, killing");
            kill(&mut child, pid).await;
            Err(WorkerError::Timeout { elapsed_ms })
        }
        () = cancel.cancelled() => {
            tracing::warn!(?pid, "Worker cancelled, killing");
            kill(&mut child, pid).await;
            Err(WorkerError::Cancelled)
        }
    };

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            stdout_task.abort();
            stderr_task.abort();
            return Err(e);
        }
    };

    // The worker has exited; its pipes close once every descendant is gone.
    let drained = tokio::select! {
        (out, err) = async { tokio::join!(&mut stdout_task, &mut stderr_task) } => {
            Some((out.unwrap_or_default(), err.unwrap_or_default()))
        }
        () = tokio::time::sleep_until(deadline) => None,
        () = cancel.cancelled() => None,
    };
    let (stdout, stderr) = match drained {
        Some(streams) => streams,
        None => {
            tracing::warn!(
                ?pid,
                elapsed_ms = elapsed_ms(start),
                "Worker exited but its output streams are still open, killing its process group"
            );
            kill_process_group(pid);
            (finish_drain(stdout_task).await, finish_drain(stderr_task).await)
        }
    };

    let exit_code = status.code();
    let duration_ms = elapsed_ms(start);

    if status.success() {
        tracing::info!(?pid, ?exit_code, duration_ms, "Worker process exited");
    } else {
        tracing::warn!(?pid, ?exit_code, duration_ms, "Worker process exited unsuccessfully");
    }

    Ok(ProcessRun {
        pid,
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        duration_ms,
    })
}

/// Collect what a drain task read, giving up after [`DRAIN_GRACE`].
async fn finish_drain(mut task: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            task.abort();
            Vec::new()
        }
    }
}

/// Read a stream line by line until EOF, logging each line and keeping up to
/// [`MAX_OUTPUT_BYTES`] of it.
async fn drain<R: AsyncRead + Unpin>(handle: Option<R>, stream: Stream, pid: Option<u32>) -> Vec<u8> {
    let mut kept = Vec::new();
    let Some(handle) = handle else {
        return kept;
    };

    let mut reader = BufReader::new(handle);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end();
                match stream {
                    Stream::Stdout => tracing::info!(target: STDOUT_TARGET, ?pid, "{text}"),
                    Stream::Stderr => tracing::warn!(target: STDERR_TARGET, ?pid, "{text}"),
                }
                let room = MAX_OUTPUT_BYTES.saturating_sub(kept.len());
                kept.extend_from_slice(&line[..line.len().min(room)]);
            }
            Err(e) => {
                tracing::debug!(?pid, ?stream, error = %e, "Stopped reading worker stream");
                break;
            }
        }
    }
    kept
}

async fn kill(child: &mut tokio::process::Child, pid: Option<u32>) {
    kill_process_group(pid);
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill worker process");
    }
}

/// SIGKILL every process in the worker's group. The group id is the worker's
/// pid, which stays reserved while any member of the group is alive.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // Safety: signalling a negative pid targets a process group; no memory is
    // touched.
    let ret = unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
    if ret == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, error = %err, "Failed to kill worker process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::worker::test_helpers::write_stub;

    fn bash(script: &tempfile::NamedTempFile, args: &[&str]) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg(script.path()).args(args);
        cmd
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let script = write_stub("echo out-line\necho err-line >&2\nexit 0\n");
        let run = run_command(
            &mut bash(&script, &[]),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .expect("run");

        assert_eq!(run.exit_code, Some(0));
        assert!(run.pid.is_some());
        assert_eq!(run.stdout.trim(), "out-line");
        assert_eq!(run.stderr.trim(), "err-line");
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let script = write_stub("exit 3\n");
        let run = run_command(
            &mut bash(&script, &[]),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .expect("non-zero exit still yields a run");

        assert_eq!(run.exit_code, Some(3));
    }

    #[tokio::test]
    async fn passes_arguments_positionally() {
        let script = write_stub("printf '%s|' \"$@\"\n");
        let run = run_command(
            &mut bash(&script, &["b", "a", "", "c"]),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .expect("run");

        assert_eq!(run.stdout, "b|a||c|");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let mut cmd = Command::new("/nonexistent/worker-binary");
        let result = run_command(&mut cmd, Duration::from_secs(5), &CancellationToken::new()).await;
        assert_matches!(result, Err(WorkerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn deadline_kills_the_worker() {
        let script = write_stub("sleep 30\n");
        let start = Instant::now();
        let result = run_command(
            &mut bash(&script, &[]),
            Duration::from_millis(200),
            &CancellationToken::new(),
        )
        .await;

        assert_matches!(result, Err(WorkerError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn deadline_covers_streams_held_by_descendants() {
        // The worker exits at once, but its background child keeps both
        // pipes open.
        let script = write_stub("echo started\nsleep 8 &\nexit 0\n");
        let start = Instant::now();
        let run = run_command(
            &mut bash(&script, &[]),
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .expect("the worker itself exited cleanly");

        assert!(
            start.elapsed() < Duration::from_secs(5),
            "deadline of 1s not honored: {:?}",
            start.elapsed()
        );
        assert_eq!(run.exit_code, Some(0));
        assert_eq!(run.stdout.trim(), "started");
    }

    #[tokio::test]
    async fn cancellation_kills_the_worker() {
        let script = write_stub("sleep 30\n");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = run_command(&mut bash(&script, &[]), Duration::from_secs(30), &cancel).await;
        assert_matches!(result, Err(WorkerError::Cancelled));
    }
}
