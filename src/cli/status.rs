// src/cli/status.rs — Daemon status display

use crate::infra::daemon;
use crate::infra::paths;
use crate::jobs::{self, JobOutcome};

/// Display daemon status, config location, and job table counts.
pub async fn show_status() -> anyhow::Result<()> {
    println!("livecap v{}", env!("CARGO_PKG_VERSION"));
    println!();

    match daemon::read_pid() {
        Some(pid) if daemon::is_daemon_running() => println!("  Daemon:     running (PID {pid})"),
        Some(pid) => println!("  Daemon:     not running (stale PID file for {pid})"),
        None => println!("  Daemon:     not running"),
    }

    let config_path = paths::config_file_path();
    if config_path.exists() {
        println!("  Config:     {} (loaded)", config_path.display());
    } else {
        println!("  Config:     (using defaults)");
    }

    let db_path = paths::db_path();
    if !db_path.exists() {
        println!("  Jobs:       (no database yet)");
        return Ok(());
    }
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    println!("  Database:   {} ({})", db_path.display(), format_bytes(db_size));

    match job_counts(&db_path) {
        Ok((pending, failed, processed)) => println!(
            "  Jobs:       {pending} pending, {failed} failed, {processed} processed"
        ),
        Err(e) => tracing::warn!("Could not read job table: {}", e),
    }
    Ok(())
}

fn job_counts(db_path: &std::path::Path) -> anyhow::Result<(i64, i64, i64)> {
    let store = jobs::open(db_path)?;
    let count = |outcome: JobOutcome| -> anyhow::Result<i64> {
        Ok(store.conn().query_row(
            "SELECT COUNT(*) FROM videos WHERE processed = ?1",
            [outcome.code()],
            |r| r.get(0),
        )?)
    };
    Ok((
        count(JobOutcome::Pending)?,
        count(JobOutcome::Failed)?,
        count(JobOutcome::Processed)?,
    ))
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}
