//! Lazy line stream over a running exec child.
//!
//! [`ExecLines`] yields stdout lines one at a time, in the order the child
//! wrote them. Nothing is read ahead: if the caller stops pulling, the child
//! eventually blocks on its own full pipe. When stdout closes, the stream
//! joins the exit watcher and turns the exit status into the final outcome,
//! so a drained stream always reports a failed exit after its last line.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exec::codec::ExecLineCodec;
use crate::exec::schema::OutputSchemaFile;
use crate::{AppError, Result};

/// How long stderr collection and input delivery may run on after the child
/// has exited.
///
/// A grandchild that inherited either pipe can hold it open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Accumulated stderr bytes for one run.
#[derive(Debug, Clone, Default)]
pub struct StderrBuffer(Arc<Mutex<Vec<u8>>>);

impl StderrBuffer {
    /// Append everything read from `stderr` until EOF or a read error.
    #[must_use]
    pub fn collect(&self, mut stderr: ChildStderr) -> JoinHandle<()> {
        let buffer = Arc::clone(&self.0);
        tokio::spawn(async move {
            let mut chunk = [0_u8; 8192];
            loop {
                match stderr.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => buffer.lock().await.extend_from_slice(&chunk[..n]),
                    Err(err) => {
                        debug!(%err, "stderr read failed, stopping collection");
                        break;
                    }
                }
            }
        })
    }

    /// Captured text so far, decoded lossily as UTF-8.
    pub async fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().await).into_owned()
    }
}

/// Everything [`ExecLines`] takes over from the supervisor at launch.
#[derive(Debug)]
pub struct RunParts {
    /// Child pid, when the OS reported one.
    pub pid: Option<u32>,
    /// Child stdout.
    pub stdout: ChildStdout,
    /// Shared stderr accumulator.
    pub stderr: StderrBuffer,
    /// Task filling `stderr`, absent when the child had no stderr handle.
    pub stderr_task: Option<JoinHandle<()>>,
    /// Task that owns the child and resolves its exit status.
    pub exit_task: JoinHandle<std::io::Result<ExitStatus>>,
    /// Task delivering the input; yields a failure that outranks the exit status.
    pub stdin_task: JoinHandle<Option<AppError>>,
    /// Cancelling this kills the child.
    pub kill: CancellationToken,
    /// Staged output schema, removed at teardown.
    pub schema: Option<OutputSchemaFile>,
}

/// Pull-based sequence of stdout lines from one exec run.
///
/// Single pass: after the final `Ok(None)` or the first `Err`, every later
/// call returns `Ok(None)`. Dropping the stream early kills the child.
#[derive(Debug)]
pub struct ExecLines {
    pid: Option<u32>,
    lines: Option<FramedRead<ChildStdout, ExecLineCodec>>,
    stderr: StderrBuffer,
    stderr_task: Option<JoinHandle<()>>,
    exit_task: Option<JoinHandle<std::io::Result<ExitStatus>>>,
    stdin_task: Option<JoinHandle<Option<AppError>>>,
    kill: CancellationToken,
    schema: Option<OutputSchemaFile>,
    yielded: usize,
    finished: bool,
}

impl ExecLines {
    /// Assemble a stream from launch-time parts.
    #[must_use]
    pub fn from_parts(parts: RunParts) -> Self {
        Self {
            pid: parts.pid,
            lines: Some(FramedRead::new(parts.stdout, ExecLineCodec::new())),
            stderr: parts.stderr,
            stderr_task: parts.stderr_task,
            exit_task: Some(parts.exit_task),
            stdin_task: Some(parts.stdin_task),
            kill: parts.kill,
            schema: parts.schema,
            yielded: 0,
            finished: false,
        }
    }

    /// Child pid, for diagnostics only.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the run has been resolved and its resources released.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next stdout line, or `Ok(None)` once the child exited successfully.
    ///
    /// # Errors
    ///
    /// - [`AppError::NonZeroExit`] / [`AppError::Signaled`] after the last
    ///   line when the child failed.
    /// - [`AppError::Io`] if stdout is not valid UTF-8, reading fails, or
    ///   stdin could not be written.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        match lines.next().await {
            Some(Ok(line)) => {
                self.yielded += 1;
                Ok(Some(line))
            }
            Some(Err(err)) => {
                warn!(pid = self.pid.unwrap_or(0), %err, "exec stdout failed");
                self.teardown();
                Err(err)
            }
            None => {
                self.lines = None;
                let outcome = self.resolve_exit().await;
                self.teardown();
                outcome.map(|()| None)
            }
        }
    }

    /// Drain every remaining line.
    ///
    /// # Errors
    ///
    /// Same as [`ExecLines::next_line`]; lines read before a failure are lost.
    pub async fn collect_lines(mut self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        while let Some(line) = self.next_line().await? {
            out.push(line);
        }
        Ok(out)
    }

    /// Adapt into a [`Stream`] that ends after success or the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<String>> {
        futures_util::stream::unfold(self, |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((Ok(line), lines)),
                Ok(None) => None,
                Err(err) => Some((Err(err), lines)),
            }
        })
    }

    /// Join the exit watcher and the input writer, then reconcile a write
    /// failure, the exit status and stderr into one outcome.
    ///
    /// A write failure wins over everything the exit watcher reports.
    async fn resolve_exit(&mut self) -> Result<()> {
        let Some(exit_task) = self.exit_task.take() else {
            return Ok(());
        };
        let waited = exit_task.await;

        if let Some(err) = self.take_input_error().await {
            return Err(err);
        }

        let status = waited
            .map_err(|err| AppError::Io(format!("exit watcher failed: {err}")))?
            .map_err(|err| AppError::Io(format!("failed to wait for child: {err}")))?;

        if status.success() {
            info!(
                pid = self.pid.unwrap_or(0),
                lines = self.yielded,
                "exec run completed"
            );
            return Ok(());
        }

        if let Some(mut task) = self.stderr_task.take() {
            if tokio::time::timeout(DRAIN_GRACE, &mut task)
                .await
                .is_err()
            {
                debug!("stderr still open after exit, using what was captured");
                task.abort();
            }
        }
        let stderr = self.stderr.text().await;
        let err = exit_outcome(status, stderr);
        if let Err(ref err) = err {
            warn!(pid = self.pid.unwrap_or(0), lines = self.yielded, %err, "exec run failed");
        }
        err
    }

    /// Failure reported by the input writer, if any.
    ///
    /// The child has exited here, so the writer normally finishes at once; a
    /// grandchild still holding stdin open gets the same grace as stderr.
    async fn take_input_error(&mut self) -> Option<AppError> {
        let mut task = self.stdin_task.take()?;
        match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => Some(AppError::Io(format!("stdin writer failed: {err}"))),
            Err(_) => {
                debug!("stdin still open after exit, abandoning input");
                task.abort();
                None
            }
        }
    }

    /// Release every resource held for the run. Runs at most once.
    fn teardown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        self.kill.cancel();
        self.lines = None;
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        if let Some(task) = self.stdin_task.take() {
            task.abort();
        }
        // Dropping the handle detaches the watcher; it still reaps the child.
        self.exit_task = None;
        if let Some(schema) = self.schema.take() {
            if let Err(err) = schema.cleanup() {
                warn!(%err, "failed to remove staged output schema");
            }
        }
    }
}

impl Drop for ExecLines {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Translate a child's exit status into the run outcome.
///
/// # Errors
///
/// - [`AppError::NonZeroExit`] for a non-zero code.
/// - [`AppError::Signaled`] when the child was killed by a signal.
pub fn exit_outcome(status: ExitStatus, stderr: String) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(AppError::NonZeroExit { code, stderr });
    }
    match exit_signal(status) {
        Some(signal) => Err(AppError::Signaled {
            signal: signal_name(signal),
            stderr,
        }),
        None => Err(AppError::NonZeroExit { code: 1, stderr }),
    }
}

/// Signal number that terminated the child, if any.
#[cfg(unix)]
#[must_use]
pub fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

/// Signal number that terminated the child, if any.
#[cfg(not(unix))]
#[must_use]
pub fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}

/// Conventional name for signal `signal` (e.g. `SIGTERM`).
#[cfg(unix)]
#[must_use]
pub fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map_or_else(|_| signal.to_string(), |sig| sig.as_str().to_owned())
}

/// Conventional name for signal `signal`.
#[cfg(not(unix))]
#[must_use]
pub fn signal_name(signal: i32) -> String {
    signal.to_string()
}
