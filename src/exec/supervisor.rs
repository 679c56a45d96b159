//! Exec process supervisor.
//!
//! Launches the resolved executable for one run:
//! - the argument vector comes from [`build_args`], the environment from
//!   [`build_env`] applied over `env_clear()` so nothing else leaks in;
//! - the whole input payload is written to stdin from a background task,
//!   which then closes it, so output is drained while input is delivered;
//! - stdout is handed to [`ExecLines`], stderr to a background collector;
//! - a watcher task owns the child and kills it when the caller's
//!   [`CancellationToken`] fires or the run is torn down.
//!
//! The child is spawned with `kill_on_drop(true)` so no exit path can leak it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::BridgeConfig;
use crate::exec::args::{build_args, LaunchOptions, LaunchRequest};
use crate::exec::env::{build_env, DEFAULT_ORIGINATOR};
use crate::exec::schema::OutputSchemaFile;
use crate::exec::stream::{ExecLines, RunParts, StderrBuffer};
use crate::{AppError, Result};

/// Launches and owns exec child processes.
///
/// A supervisor holds no per-run state, so one instance may drive any
/// number of concurrent runs.
#[derive(Debug, Clone)]
pub struct ExecSupervisor {
    executable: PathBuf,
    env_override: Option<HashMap<String, String>>,
    originator: String,
    api_key: Option<String>,
    base_url: Option<String>,
    defaults: LaunchOptions,
}

impl ExecSupervisor {
    /// Supervisor for an explicit executable path.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            env_override: None,
            originator: DEFAULT_ORIGINATOR.to_owned(),
            api_key: None,
            base_url: None,
            defaults: LaunchOptions::default(),
        }
    }

    /// Build a supervisor from configuration, resolving the executable.
    ///
    /// # Errors
    ///
    /// Propagates resolver failures from [`BridgeConfig::executable`].
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Ok(Self {
            executable: config.executable()?,
            env_override: config.env.clone(),
            originator: config.originator.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            defaults: config.defaults.clone(),
        })
    }

    /// Replace the parent environment wholesale for every run.
    #[must_use]
    pub fn with_env_override(mut self, env: HashMap<String, String>) -> Self {
        self.env_override = Some(env);
        self
    }

    /// Override the originator tag injected when the environment lacks one.
    #[must_use]
    pub fn with_originator(mut self, originator: impl Into<String>) -> Self {
        self.originator = originator.into();
        self
    }

    /// Options filled into every request that leaves them unset.
    #[must_use]
    pub fn with_defaults(mut self, defaults: LaunchOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Executable this supervisor launches.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Environment a run with `request` would receive.
    ///
    /// Per-request base URL and API key win over the supervisor defaults.
    #[must_use]
    pub fn launch_env(&self, request: &LaunchRequest) -> HashMap<String, String> {
        build_env(
            self.env_override.as_ref(),
            &self.originator,
            request
                .options
                .base_url
                .as_deref()
                .or(self.base_url.as_deref()),
            request.options.api_key.as_deref().or(self.api_key.as_deref()),
        )
    }

    /// Start one run and return its line stream.
    ///
    /// When `cancel` fires, the child is killed; the resulting exit surfaces
    /// through [`ExecLines`] like any other failure. The input is written in
    /// the background while output is read, so a child that prints before
    /// reading never blocks the launch.
    ///
    /// # Errors
    ///
    /// - [`AppError::Schema`] if the output schema is not a JSON object.
    /// - [`AppError::Spawn`] if the OS refuses to start the process.
    /// - [`AppError::StreamUnavailable`] if stdin or stdout is missing; the
    ///   child is killed before returning.
    /// - [`AppError::Io`] if staging the schema fails.
    pub async fn launch(
        &self,
        request: LaunchRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ExecLines> {
        let span = info_span!("exec_launch", executable = %self.executable.display());
        self.launch_inner(request, cancel).instrument(span).await
    }

    async fn launch_inner(
        &self,
        mut request: LaunchRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ExecLines> {
        request.options = request.options.with_fallback(&self.defaults);

        let schema = request
            .output_schema
            .as_ref()
            .map(OutputSchemaFile::stage)
            .transpose()?;
        let args = build_args(&request.options, schema.as_ref().map(OutputSchemaFile::path));
        let env = self.launch_env(&request);

        debug!(?args, "exec arguments built");

        let mut child = Command::new(&self.executable)
            .args(&args)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AppError::Spawn(format!(
                    "failed to spawn {}: {err}",
                    self.executable.display()
                ))
            })?;

        let pid = child.id();
        info!(pid = pid.unwrap_or(0), "exec process spawned");

        let Some(stdin) = child.stdin.take() else {
            abort_child(&mut child).await;
            return Err(AppError::StreamUnavailable(
                "child process has no stdin".into(),
            ));
        };

        let Some(stdout) = child.stdout.take() else {
            abort_child(&mut child).await;
            return Err(AppError::StreamUnavailable(
                "child process has no stdout".into(),
            ));
        };

        let stderr_buffer = StderrBuffer::default();
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| stderr_buffer.collect(stderr));

        let kill = cancel.map_or_else(CancellationToken::new, |token| token.child_token());
        let exit_task = watch_exit(child, kill.clone());
        let stdin_task = write_input(stdin, request.input, kill.clone());

        Ok(ExecLines::from_parts(RunParts {
            pid,
            stdout,
            stderr: stderr_buffer,
            stderr_task,
            exit_task,
            stdin_task,
            kill,
            schema,
        }))
    }
}

/// Write `input` to the child's stdin and close it, unless `kill` fires first.
///
/// A child that closes stdin early is not a failure; any other write error
/// is returned and outranks the exit status.
fn write_input(
    mut stdin: ChildStdin,
    input: String,
    kill: CancellationToken,
) -> JoinHandle<Option<AppError>> {
    tokio::spawn(async move {
        let written = tokio::select! {
            result = stdin.write_all(input.as_bytes()) => result,
            () = kill.cancelled() => {
                debug!("run cancelled while writing stdin");
                return None;
            }
        };
        match written {
            Ok(()) => None,
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!("child closed stdin before reading the full input");
                None
            }
            Err(err) => {
                warn!(%err, "failed to write input to child stdin");
                Some(AppError::Io(format!("stdin write failed: {err}")))
            }
        }
    })
}

/// Own `child` until it exits, killing it first if `kill` fires.
fn watch_exit(
    mut child: Child,
    kill: CancellationToken,
) -> JoinHandle<std::io::Result<std::process::ExitStatus>> {
    tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => status,
            () = kill.cancelled() => {
                if let Err(err) = child.start_kill() {
                    debug!(%err, "kill skipped, child already gone");
                }
                child.wait().await
            }
        }
    })
}

async fn abort_child(child: &mut Child) {
    if let Err(err) = child.kill().await {
        debug!(%err, "failed to kill child during launch abort");
    }
}
