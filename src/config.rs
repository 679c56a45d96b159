//! Bridge configuration parsing, validation, and credential loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::exec::args::LaunchOptions;
use crate::exec::env::{API_KEY_ENV, DEFAULT_ORIGINATOR};
use crate::resolver::{self, Platform, DEFAULT_COMPONENT};
use crate::{AppError, Result};

/// Keychain service under which the API key may be stored.
pub const KEYRING_SERVICE: &str = "codex-exec-bridge";

/// Environment variable naming the relay's config file.
pub const RELAY_CONFIG_ENV: &str = "CODEX_RELAY_CONFIG";

/// Environment variable overriding the executable path.
pub const EXECUTABLE_ENV: &str = "CODEX_EXECUTABLE";

fn default_component() -> String {
    DEFAULT_COMPONENT.into()
}

fn default_originator() -> String {
    DEFAULT_ORIGINATOR.into()
}

/// Bridge configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct BridgeConfig {
    /// Explicit executable; skips vendor resolution when set.
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
    /// Vendor directory; defaults to `<exe dir>/../vendor`.
    #[serde(default)]
    pub vendor_root: Option<PathBuf>,
    /// Vendor component (and binary stem) to launch.
    #[serde(default = "default_component")]
    pub component: String,
    /// Base URL handed to the child through the environment.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Originator tag injected when the environment lacks one.
    #[serde(default = "default_originator")]
    pub originator: String,
    /// Wholesale replacement for the parent environment.
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    /// Launch options applied to every run unless the caller overrides them.
    #[serde(default)]
    pub defaults: LaunchOptions,
    /// API key (populated at runtime, never read from the file).
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            vendor_root: None,
            component: default_component(),
            base_url: None,
            originator: default_originator(),
            env: None,
            defaults: LaunchOptions::default(),
            api_key: None,
        }
    }
}

impl BridgeConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for the standalone relay.
    ///
    /// Reads the file named by [`RELAY_CONFIG_ENV`] when set, then applies
    /// [`EXECUTABLE_ENV`] on top.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the named file is unreadable or invalid.
    pub fn from_process_env() -> Result<Self> {
        let mut config = match env::var_os(RELAY_CONFIG_ENV) {
            Some(path) => Self::load_from_path(PathBuf::from(path))?,
            None => Self::default(),
        };
        if let Some(path) = env::var_os(EXECUTABLE_ENV) {
            config.executable_path = Some(PathBuf::from(path));
            config.validate()?;
        }
        Ok(config)
    }

    /// Load the API key from the OS keychain with env-var fallback.
    ///
    /// A missing key is not an error; the child then relies on its own login.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain task cannot be joined.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if self.api_key.is_none() {
            self.api_key = load_credential("api_key", API_KEY_ENV).await?;
        }
        Ok(())
    }

    /// Vendor directory to search.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the default root cannot be derived.
    pub fn vendor_root(&self) -> Result<PathBuf> {
        match &self.vendor_root {
            Some(root) => Ok(root.clone()),
            None => resolver::default_vendor_root(),
        }
    }

    /// Executable to launch: the explicit path, or the vendored binary for
    /// the host platform.
    ///
    /// # Errors
    ///
    /// Propagates [`AppError::UnsupportedPlatform`] and
    /// [`AppError::BinaryNotFound`] from the resolver.
    pub fn executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.executable_path {
            return Ok(path.clone());
        }
        resolver::resolve_binary(&self.vendor_root()?, Platform::current(), &self.component)
    }

    fn validate(&self) -> Result<()> {
        if self.component.trim().is_empty() {
            return Err(AppError::Config("component must not be empty".into()));
        }

        if self.originator.trim().is_empty() {
            return Err(AppError::Config("originator must not be empty".into()));
        }

        if let Some(path) = &self.executable_path {
            if !path.is_file() {
                return Err(AppError::Config(format!(
                    "executable_path does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

/// Load a single optional credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(keyring::Error::NoEntry) => {
            debug!(key = keyring_key, "no keychain entry, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    Ok(env::var(env_key).ok().filter(|value| !value.is_empty()))
}
