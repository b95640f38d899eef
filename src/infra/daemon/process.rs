// src/infra/daemon/process.rs

use std::path::PathBuf;

use crate::infra::paths;

/// Write a PID file for the daemon.
pub fn write_pid_file() -> anyhow::Result<PathBuf> {
    let pid_path = paths::pid_file_path();
    if let Some(parent) = pid_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&pid_path, std::process::id().to_string())?;
    Ok(pid_path)
}

/// Remove the PID file.
pub fn remove_pid_file() {
    let _ = std::fs::remove_file(paths::pid_file_path());
}

/// PID recorded in the PID file, if any.
pub fn read_pid() -> Option<u32> {
    std::fs::read_to_string(paths::pid_file_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Check if a daemon is already running.
pub fn is_daemon_running() -> bool {
    let Some(pid) = read_pid() else {
        return false;
    };

    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// Send SIGTERM to the recorded daemon. Returns the PID signalled.
pub fn stop_daemon() -> anyhow::Result<Option<u32>> {
    let Some(pid) = read_pid() else {
        return Ok(None);
    };
    if !is_daemon_running() {
        tracing::info!("Daemon (PID {}) is not running; removing stale PID file", pid);
        remove_pid_file();
        return Ok(None);
    }

    #[cfg(unix)]
    {
        let status = std::process::Command::new("kill")
            .arg(pid.to_string())
            .status()?;
        if !status.success() {
            anyhow::bail!("failed to signal daemon (PID {pid})");
        }
        Ok(Some(pid))
    }
    #[cfg(not(unix))]
    {
        anyhow::bail!("daemon stop is only supported on Unix systems (PID {pid})")
    }
}
