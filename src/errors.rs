//! Error types shared across the bridge.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Shared bridge result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Bridge error enumeration covering every failure mode of a run.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// No vendored target is known for the host operating system and architecture.
    UnsupportedPlatform {
        /// Operating system name as reported by the host.
        os: String,
        /// CPU architecture name as reported by the host.
        arch: String,
    },
    /// Targets are known but no executable exists at any candidate path.
    BinaryNotFound {
        /// Every candidate path that was checked, in priority order.
        searched: Vec<PathBuf>,
    },
    /// The operating system refused to start the child process.
    Spawn(String),
    /// The child process is missing an expected stdio handle.
    StreamUnavailable(String),
    /// The child ran and exited with a non-zero code.
    NonZeroExit {
        /// Exit code reported by the child.
        code: i32,
        /// Everything the child wrote to stderr, decoded as UTF-8.
        stderr: String,
    },
    /// The child was terminated by a signal rather than exiting normally.
    Signaled {
        /// Signal name (e.g. `SIGKILL`), or its number when unnamed.
        signal: String,
        /// Everything the child wrote to stderr, decoded as UTF-8.
        stderr: String,
    },
    /// The output schema could not be staged for the child.
    Schema(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Whether this error came from the child's own exit status rather than
    /// from launching or reading it.
    #[must_use]
    pub fn is_exit_failure(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. } | Self::Signaled { .. })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::UnsupportedPlatform { os, arch } => {
                write!(f, "unsupported platform: {os} ({arch})")
            }
            Self::BinaryNotFound { searched } => {
                write!(f, "binary not found: searched ")?;
                for (idx, path) in searched.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::StreamUnavailable(msg) => write!(f, "stream unavailable: {msg}"),
            Self::NonZeroExit { code, stderr } => {
                write!(f, "exec exited with code {code}: {stderr}")
            }
            Self::Signaled { signal, stderr } => {
                write!(f, "exec exited with signal {signal}: {stderr}")
            }
            Self::Schema(msg) => write!(f, "schema: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
