//! Vendored binary resolution.
//!
//! Maps the host operating system and CPU architecture to an ordered list of
//! platform targets, then searches the vendor directory for the first target
//! that actually ships the requested component:
//!
//! ```text
//! <vendor-root>/<target>/<component>/<component>[.exe]
//! ```
//!
//! Resolution only touches the file system to check for existence. Nothing
//! is spawned here.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{AppError, Result};

/// Default vendor component (and binary stem) that the bridge launches.
pub const DEFAULT_COMPONENT: &str = "codex";

/// Host operating system and CPU architecture, using the spellings of
/// [`std::env::consts::OS`] and [`std::env::consts::ARCH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Operating system name (`linux`, `android`, `macos`, `windows`, …).
    pub os: &'static str,
    /// CPU architecture name (`x86_64`, `aarch64`, …).
    pub arch: &'static str,
}

impl Platform {
    /// The platform this process is running on.
    #[must_use]
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    /// Candidate targets for this platform, most preferred first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnsupportedPlatform`] when no target is known.
    pub fn targets(&self) -> Result<Vec<&'static str>> {
        target_triples(self.os, self.arch)
    }

    /// File name of `component` on this platform.
    #[must_use]
    pub fn binary_file_name(&self, component: &str) -> String {
        if self.os == "windows" {
            format!("{component}.exe")
        } else {
            component.to_owned()
        }
    }
}

/// Ordered platform targets for an `(os, arch)` pair.
///
/// Android prefers its own target and falls back to the equivalent
/// musl-libc Linux build.
///
/// # Errors
///
/// Returns [`AppError::UnsupportedPlatform`] for pairs with no known target.
pub fn target_triples(os: &str, arch: &str) -> Result<Vec<&'static str>> {
    let targets: &[&'static str] = match (os, arch) {
        ("linux", "x86_64") => &["x86_64-unknown-linux-musl"],
        ("linux", "aarch64") => &["aarch64-unknown-linux-musl"],
        ("android", "x86_64") => &["x86_64-linux-android", "x86_64-unknown-linux-musl"],
        ("android", "aarch64") => &["aarch64-linux-android", "aarch64-unknown-linux-musl"],
        ("macos", "x86_64") => &["x86_64-apple-darwin"],
        ("macos", "aarch64") => &["aarch64-apple-darwin"],
        ("windows", "x86_64") => &["x86_64-pc-windows-msvc"],
        ("windows", "aarch64") => &["aarch64-pc-windows-msvc"],
        _ => &[],
    };

    if targets.is_empty() {
        return Err(AppError::UnsupportedPlatform {
            os: os.to_owned(),
            arch: arch.to_owned(),
        });
    }

    Ok(targets.to_vec())
}

/// Candidate executable paths for `component`, in priority order.
///
/// # Errors
///
/// Returns [`AppError::UnsupportedPlatform`] when the platform has no targets.
pub fn candidate_paths(
    vendor_root: &Path,
    platform: Platform,
    component: &str,
) -> Result<Vec<PathBuf>> {
    let file_name = platform.binary_file_name(component);
    Ok(platform
        .targets()?
        .into_iter()
        .map(|target| vendor_root.join(target).join(component).join(&file_name))
        .collect())
}

/// Find the first existing executable for `component` under `vendor_root`.
///
/// # Errors
///
/// - [`AppError::UnsupportedPlatform`] when the platform has no targets.
/// - [`AppError::BinaryNotFound`] listing every path searched when none exist.
pub fn resolve_binary(vendor_root: &Path, platform: Platform, component: &str) -> Result<PathBuf> {
    let searched = candidate_paths(vendor_root, platform, component)?;

    if let Some(found) = searched.iter().find(|path| path.is_file()) {
        debug!(path = %found.display(), "resolved vendored binary");
        return Ok(found.clone());
    }

    Err(AppError::BinaryNotFound { searched })
}

/// Directory of bundled helper tools for the first target that ships one.
///
/// Returns `None` when the platform is unsupported or no target carries a
/// `path` directory.
#[must_use]
pub fn helper_path_dir(vendor_root: &Path, platform: Platform) -> Option<PathBuf> {
    platform
        .targets()
        .ok()?
        .into_iter()
        .map(|target| vendor_root.join(target).join("path"))
        .find(|dir| dir.is_dir())
}

/// Default vendor root: `<dir of the running executable>/../vendor`.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the current executable cannot be located.
pub fn default_vendor_root() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| AppError::Io(format!("executable has no parent: {}", exe.display())))?;
    Ok(dir.join("..").join("vendor"))
}
