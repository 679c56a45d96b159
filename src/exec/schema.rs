//! Output-schema staging.
//!
//! The executable only accepts a schema as a file path, so a schema supplied
//! in-memory is written to `schema.json` inside a private temp directory that
//! lives exactly as long as the run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::{AppError, Result};

/// A staged schema file, removed when dropped.
#[derive(Debug)]
pub struct OutputSchemaFile {
    dir: TempDir,
    path: PathBuf,
}

impl OutputSchemaFile {
    /// Write `schema` to a fresh temp directory.
    ///
    /// # Errors
    ///
    /// - [`AppError::Schema`] if `schema` is not a JSON object.
    /// - [`AppError::Io`] if the directory or file cannot be written.
    pub fn stage(schema: &serde_json::Value) -> Result<Self> {
        if !schema.is_object() {
            return Err(AppError::Schema("output schema must be a JSON object".into()));
        }

        let dir = tempfile::Builder::new()
            .prefix("codex-output-schema-")
            .tempdir()?;
        let path = dir.path().join("schema.json");
        let bytes = serde_json::to_vec(schema)
            .map_err(|err| AppError::Schema(format!("failed to serialise schema: {err}")))?;
        std::fs::write(&path, bytes)?;

        debug!(path = %path.display(), "output schema staged");
        Ok(Self { dir, path })
    }

    /// Path of the staged `schema.json`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged file now instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be removed.
    pub fn cleanup(self) -> Result<()> {
        self.dir.close().map_err(AppError::from)
    }
}
