//! Shared helpers for process-level integration tests.
//!
//! Builds throwaway shell scripts that stand in for the real executable so
//! tests can drive exact stdout, stderr, exit and signal behaviour.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use codex_exec_bridge::ExecSupervisor;

/// Write an executable `/bin/sh` script named `codex` into `dir`.
pub fn fake_exec(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("codex");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake exec");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod fake exec");
    path
}

/// Temp dir plus a supervisor pointed at a fake exec running `body`.
pub fn supervisor_for(body: &str) -> (tempfile::TempDir, ExecSupervisor) {
    let dir = tempfile::tempdir().expect("tempdir");
    let exe = fake_exec(dir.path(), body);
    (dir, ExecSupervisor::new(exe))
}

/// Whether a process with `pid` still exists (zombies excluded once reaped).
pub fn pid_alive(pid: u32) -> bool {
    let pid = i32::try_from(pid).expect("pid fits i32");
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}

/// Poll until `pid` is gone or `limit` elapses; returns whether it is gone.
pub async fn wait_for_exit(pid: u32, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if !pid_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    !pid_alive(pid)
}
