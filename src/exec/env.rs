//! Child environment composition.
//!
//! The environment is built in two tiers. The base tier is either the
//! caller's override map, taken wholesale, or a snapshot of the parent
//! process environment. The fixed entries are then overlaid on top. The
//! ambient environment is never consulted when an override is supplied.

use std::collections::HashMap;

/// Originator marker read by the child for attribution.
pub const ORIGINATOR_ENV: &str = "CODEX_INTERNAL_ORIGINATOR_OVERRIDE";

/// Default originator tag for runs launched through this crate.
pub const DEFAULT_ORIGINATOR: &str = "codex_sdk_rs";

/// Base URL override for the model provider.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// API key handed to the child.
pub const API_KEY_ENV: &str = "CODEX_API_KEY";

/// Two-tier environment: a base tier plus a fixed overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMap {
    base: HashMap<String, String>,
    overlay: HashMap<String, String>,
}

impl EnvironmentMap {
    /// Start from the parent process environment. Entries that are not
    /// valid UTF-8 are skipped.
    #[must_use]
    pub fn from_parent() -> Self {
        Self::from_base(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// Start from an explicit base tier.
    #[must_use]
    pub fn from_base(base: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            base: base.into_iter().collect(),
            overlay: HashMap::new(),
        }
    }

    /// Use `override_env` wholesale when present, otherwise the parent
    /// environment.
    #[must_use]
    pub fn with_override(override_env: Option<&HashMap<String, String>>) -> Self {
        match override_env {
            Some(env) => Self::from_base(env.clone()),
            None => Self::from_parent(),
        }
    }

    /// Overlay `key`, replacing any base value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.overlay.insert(key.into(), value.into());
    }

    /// Overlay `key` only when neither tier already defines it.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.get(&key).is_none() {
            self.overlay.insert(key, value.into());
        }
    }

    /// Effective value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overlay
            .get(key)
            .or_else(|| self.base.get(key))
            .map(String::as_str)
    }

    /// Prepend `dir` to the effective `PATH`.
    pub fn prepend_path(&mut self, dir: &std::path::Path) {
        let separator = if cfg!(windows) { ';' } else { ':' };
        let dir = dir.to_string_lossy().into_owned();
        let value = match self.get("PATH") {
            Some(existing) if !existing.is_empty() => format!("{dir}{separator}{existing}"),
            _ => dir,
        };
        self.set("PATH", value);
    }

    /// Apply the fixed entries every launch carries.
    pub fn apply_launch_entries(
        &mut self,
        originator: &str,
        base_url: Option<&str>,
        api_key: Option<&str>,
    ) {
        self.set_default(ORIGINATOR_ENV, originator);
        if let Some(url) = base_url {
            self.set(BASE_URL_ENV, url);
        }
        if let Some(key) = api_key {
            self.set(API_KEY_ENV, key);
        }
    }

    /// Flatten both tiers, overlay winning.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        let mut merged = self.base;
        merged.extend(self.overlay);
        merged
    }
}

/// Compose the launch environment in one step.
#[must_use]
pub fn build_env(
    override_env: Option<&HashMap<String, String>>,
    originator: &str,
    base_url: Option<&str>,
    api_key: Option<&str>,
) -> HashMap<String, String> {
    let mut env = EnvironmentMap::with_override(override_env);
    env.apply_launch_entries(originator, base_url, api_key);
    env.into_map()
}
