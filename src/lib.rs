#![forbid(unsafe_code)]

//! `codex-exec-bridge` — supervise a vendored codex executable and stream
//! its stdout as a lazy sequence of lines.
//!
//! - [`resolver`] finds the executable for the host platform.
//! - [`exec`] launches one run, feeds stdin, streams stdout lines and turns
//!   the exit status into a structured outcome.
//! - [`relay`] is the standalone variant that forwards parent signals to the
//!   child and mirrors its exit.

pub mod config;
pub mod errors;
pub mod exec;
pub mod relay;
pub mod resolver;

pub use config::BridgeConfig;
pub use errors::{AppError, Result};
pub use exec::{ExecLines, ExecSupervisor, LaunchOptions, LaunchRequest};
