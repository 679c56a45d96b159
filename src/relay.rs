//! Standalone signal-forwarding relay.
//!
//! Runs the executable with inherited stdio as a transparent stand-in for
//! the current process. SIGINT, SIGTERM and SIGHUP received by the parent are
//! forwarded to the child. Once the child exits, the parent mirrors it: a
//! signal death is re-raised against the parent itself, a normal exit is
//! passed through as the same exit code.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;

use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::exec::stream::exit_signal;
use crate::{AppError, Result};

/// Capacity of the signal fan-out channel.
const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Process-wide signal registration; set once, shared by every relay.
static FORWARDER: Mutex<Option<broadcast::Sender<i32>>> = Mutex::new(None);

/// How the child finished, in the terms the parent must mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Normal exit with this code.
    Code(i32),
    /// Killed by this signal number.
    Signal(i32),
}

impl ExitDisposition {
    /// Classify an exit status; a missing code counts as `Code(1)`.
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        match exit_signal(status) {
            Some(signal) => Self::Signal(signal),
            None => Self::Code(status.code().unwrap_or(1)),
        }
    }
}

/// Register the parent's SIGINT/SIGTERM/SIGHUP listeners, once per process.
///
/// Later calls subscribe to the existing registration. Must be called from
/// within a tokio runtime; the listener tasks live on that runtime.
///
/// # Errors
///
/// Returns [`AppError::Io`] if a signal listener cannot be registered.
pub fn install_signal_forwarding() -> Result<broadcast::Receiver<i32>> {
    let mut guard = FORWARDER
        .lock()
        .map_err(|_| AppError::Io("signal registration lock poisoned".into()))?;

    if let Some(tx) = guard.as_ref() {
        return Ok(tx.subscribe());
    }

    let (tx, rx) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
    register_listeners(&tx)?;
    *guard = Some(tx);
    Ok(rx)
}

#[cfg(unix)]
fn register_listeners(tx: &broadcast::Sender<i32>) -> Result<()> {
    use nix::sys::signal::Signal;
    use tokio::signal::unix::{signal, SignalKind};

    let kinds = [
        (SignalKind::interrupt(), Signal::SIGINT),
        (SignalKind::terminate(), Signal::SIGTERM),
        (SignalKind::hangup(), Signal::SIGHUP),
    ];

    for (kind, sig) in kinds {
        let mut stream = signal(kind).map_err(|err| {
            AppError::Io(format!("failed to register {} handler: {err}", sig.as_str()))
        })?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!(signal = sig.as_str(), "relay received signal");
                // No receivers simply means no child is running right now.
                let _ = tx.send(sig as i32);
            }
        });
    }

    Ok(())
}

#[cfg(not(unix))]
fn register_listeners(_tx: &broadcast::Sender<i32>) -> Result<()> {
    // The console delivers Ctrl-C to the child directly.
    Ok(())
}

/// Run `program` with inherited stdio, forwarding parent signals until it
/// exits.
///
/// # Errors
///
/// - [`AppError::Io`] if signal registration or waiting on the child fails.
/// - [`AppError::Spawn`] if the child cannot be started.
pub async fn run_forwarding(
    program: &Path,
    args: &[OsString],
    env: &HashMap<String, String>,
) -> Result<ExitDisposition> {
    let mut signals = install_signal_forwarding()?;

    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            AppError::Spawn(format!("failed to spawn {}: {err}", program.display()))
        })?;

    info!(
        pid = child.id().unwrap_or(0),
        program = %program.display(),
        "relay child spawned"
    );

    let status = loop {
        tokio::select! {
            status = child.wait() => break status?,
            received = signals.recv() => match received {
                Ok(signal) => forward_signal(&child, signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "relay fell behind on signals");
                }
                Err(broadcast::error::RecvError::Closed) => break child.wait().await?,
            },
        }
    };

    let disposition = ExitDisposition::from_status(status);
    debug!(?disposition, "relay child exited");
    Ok(disposition)
}

/// Best-effort delivery of `signal` to `child`; a reaped child is skipped.
#[cfg(unix)]
fn forward_signal(child: &Child, signal: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        debug!(signal, "child already exited, not forwarding");
        return;
    };
    let (Ok(pid), Ok(sig)) = (i32::try_from(pid), Signal::try_from(signal)) else {
        return;
    };
    if let Err(err) = kill(Pid::from_raw(pid), sig) {
        debug!(%err, signal = sig.as_str(), "signal forwarding failed");
    }
}

#[cfg(not(unix))]
fn forward_signal(_child: &Child, _signal: i32) {}

/// Terminate the current process the same way the child did.
///
/// Call outside the tokio runtime, after it has shut down.
pub fn mirror_exit(disposition: ExitDisposition) -> ! {
    match disposition {
        ExitDisposition::Code(code) => std::process::exit(code),
        ExitDisposition::Signal(signal) => {
            reraise(signal);
            // Only reached if the signal did not terminate us.
            std::process::exit(128_i32.saturating_add(signal))
        }
    }
}

/// Restore the default disposition for `signal` and raise it.
#[cfg(unix)]
fn reraise(signal: i32) {
    if let Err(err) = signal_hook::low_level::emulate_default_handler(signal) {
        warn!(
            %err,
            signal = %crate::exec::stream::signal_name(signal),
            "failed to re-raise child signal"
        );
    }
}

#[cfg(not(unix))]
fn reraise(_signal: i32) {}
