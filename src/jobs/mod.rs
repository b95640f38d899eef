// src/jobs/mod.rs — Durable job table (recording ↔ transcript bookkeeping)

pub mod schema;
pub mod server;
pub mod store;

use async_trait::async_trait;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

pub use server::{spawn_job_server, JobHandle};
pub use store::JobStore;

/// Processing state of a recording. Codes match the `processed` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Pending,
    Failed,
    Processed,
}

impl JobOutcome {
    pub fn code(self) -> i64 {
        match self {
            JobOutcome::Pending => 0,
            JobOutcome::Failed => 1,
            JobOutcome::Processed => 2,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => JobOutcome::Failed,
            2 => JobOutcome::Processed,
            _ => JobOutcome::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRow {
    pub id: i64,
    pub media_path: String,
    pub transcript_path: String,
    pub channel: Option<String>,
    pub outcome: JobOutcome,
    pub created_at: String,
}

/// Append-mostly record of finished recordings awaiting post-processing.
#[async_trait]
pub trait JobTable: Send + Sync {
    async fn insert(
        &self,
        media_path: &str,
        transcript_path: &str,
        channel: Option<&str>,
    ) -> anyhow::Result<i64>;

    async fn delete(&self, media_path: &str) -> anyhow::Result<usize>;

    async fn mark_outcome(&self, id: i64, outcome: JobOutcome) -> anyhow::Result<()>;

    async fn get(&self, id: i64) -> anyhow::Result<Option<JobRow>>;

    async fn pending(&self) -> anyhow::Result<Vec<JobRow>>;
}

/// Open (or create) the job database at the given path.
pub fn open(path: &Path) -> anyhow::Result<JobStore> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    // Enable WAL mode so the batch processor can read while the daemon writes
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    schema::run_migrations(&conn)?;
    Ok(JobStore::new(conn))
}

/// Create an in-memory database (for testing).
pub fn in_memory() -> anyhow::Result<JobStore> {
    let conn = Connection::open_in_memory()?;
    schema::run_migrations(&conn)?;
    Ok(JobStore::new(conn))
}
