#![forbid(unsafe_code)]

//! `codex-relay` — transparent launcher for the vendored codex binary.
//!
//! Resolves the executable, passes every argument through, inherits stdio,
//! forwards SIGINT/SIGTERM/SIGHUP to the child and finally exits the same
//! way the child did.

use std::ffi::OsString;

use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use codex_exec_bridge::exec::env::EnvironmentMap;
use codex_exec_bridge::relay::{self, ExitDisposition};
use codex_exec_bridge::resolver::{self, Platform};
use codex_exec_bridge::{AppError, BridgeConfig, Result};

fn main() {
    if let Err(err) = init_tracing() {
        eprintln!("codex-relay: {err}");
    }

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    // The runtime is gone here, so re-raising cannot be intercepted by its
    // signal listeners.
    match outcome {
        Ok(disposition) => relay::mirror_exit(disposition),
        Err(err) => {
            error!(%err, "codex-relay failed");
            eprintln!("codex-relay: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Vec<OsString>) -> Result<ExitDisposition> {
    let config = BridgeConfig::from_process_env()?;
    let program = config.executable()?;

    let mut env = EnvironmentMap::with_override(config.env.as_ref());
    if config.executable_path.is_none() {
        if let Some(dir) = resolver::helper_path_dir(&config.vendor_root()?, Platform::current()) {
            env.prepend_path(&dir);
        }
    }

    relay::run_forwarding(&program, &args, &env.into_map()).await
}

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))
}
