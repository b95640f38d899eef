// src/jobs/server.rs — Async message passing for JobStore

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::store::JobStore;
use super::{JobOutcome, JobRow, JobTable};

#[derive(Debug)]
pub enum JobCommand {
    Insert {
        media_path: String,
        transcript_path: String,
        channel: Option<String>,
        resp: oneshot::Sender<anyhow::Result<i64>>,
    },
    Delete {
        media_path: String,
        resp: oneshot::Sender<anyhow::Result<usize>>,
    },
    MarkOutcome {
        id: i64,
        outcome: JobOutcome,
        resp: oneshot::Sender<anyhow::Result<()>>,
    },
    Get {
        id: i64,
        resp: oneshot::Sender<anyhow::Result<Option<JobRow>>>,
    },
    Pending {
        resp: oneshot::Sender<anyhow::Result<Vec<JobRow>>>,
    },
}

/// A handle to the JobStore that uses message passing.
#[derive(Clone)]
pub struct JobHandle {
    tx: mpsc::Sender<JobCommand>,
}

impl JobHandle {
    pub fn new(tx: mpsc::Sender<JobCommand>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl JobTable for JobHandle {
    async fn insert(
        &self,
        media_path: &str,
        transcript_path: &str,
        channel: Option<&str>,
    ) -> anyhow::Result<i64> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(JobCommand::Insert {
                media_path: media_path.to_string(),
                transcript_path: transcript_path.to_string(),
                channel: channel.map(str::to_string),
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    async fn delete(&self, media_path: &str) -> anyhow::Result<usize> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(JobCommand::Delete {
                media_path: media_path.to_string(),
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    async fn mark_outcome(&self, id: i64, outcome: JobOutcome) -> anyhow::Result<()> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(JobCommand::MarkOutcome {
                id,
                outcome,
                resp: resp_tx,
            })
            .await?;
        resp_rx.await?
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<JobRow>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx.send(JobCommand::Get { id, resp: resp_tx }).await?;
        resp_rx.await?
    }

    async fn pending(&self) -> anyhow::Result<Vec<JobRow>> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx.send(JobCommand::Pending { resp: resp_tx }).await?;
        resp_rx.await?
    }
}

/// Helper to spawn the job server and return a handle.
pub fn spawn_job_server(store: JobStore) -> (JobHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = JobHandle::new(tx);
    let join_handle = tokio::spawn(run_job_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the JobStore.
pub async fn run_job_server(store: JobStore, mut rx: mpsc::Receiver<JobCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JobCommand::Insert {
                media_path,
                transcript_path,
                channel,
                resp,
            } => {
                let res = store.insert_job(&media_path, &transcript_path, channel.as_deref());
                let _ = resp.send(res);
            }
            JobCommand::Delete { media_path, resp } => {
                let _ = resp.send(store.delete_job(&media_path));
            }
            JobCommand::MarkOutcome { id, outcome, resp } => {
                let _ = resp.send(store.mark_outcome(id, outcome));
            }
            JobCommand::Get { id, resp } => {
                let _ = resp.send(store.get_job(id));
            }
            JobCommand::Pending { resp } => {
                let _ = resp.send(store.pending_jobs());
            }
        }
    }
    tracing::debug!("Job server stopped");
}
