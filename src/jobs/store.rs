// src/jobs/store.rs — SQLite operations

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{JobOutcome, JobRow};

/// Low-level SQLite operations on the job table.
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_job(
        &self,
        media_path: &str,
        transcript_path: &str,
        channel: Option<&str>,
    ) -> anyhow::Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO videos (file_path, chat_file_path, channel, processed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                media_path,
                transcript_path,
                channel,
                JobOutcome::Pending.code(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Delete every row for a media file; returns the number removed.
    pub fn delete_job(&self, media_path: &str) -> anyhow::Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM videos WHERE file_path = ?1", params![media_path])?;
        Ok(removed)
    }

    pub fn mark_outcome(&self, id: i64, outcome: JobOutcome) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE videos SET processed = ?1, updated_at = ?2 WHERE id = ?3",
            params![outcome.code(), now, id],
        )?;
        if updated == 0 {
            anyhow::bail!("Job {id} not found");
        }
        Ok(())
    }

    pub fn get_job(&self, id: i64) -> anyhow::Result<Option<JobRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, file_path, chat_file_path, channel, processed, created_at
                 FROM videos WHERE id = ?1",
                params![id],
                row_to_job,
            )
            .optional()?;
        Ok(row)
    }

    pub fn pending_jobs(&self) -> anyhow::Result<Vec<JobRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_path, chat_file_path, channel, processed, created_at
             FROM videos WHERE processed = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![JobOutcome::Pending.code()], row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRow> {
    let code: i64 = row.get(4)?;
    Ok(JobRow {
        id: row.get(0)?,
        media_path: row.get(1)?,
        transcript_path: row.get(2)?,
        channel: row.get(3)?,
        outcome: JobOutcome::from_code(code),
        created_at: row.get(5)?,
    })
}
