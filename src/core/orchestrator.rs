// src/core/orchestrator.rs — Watchlist / active-session lifecycle and the poll loop

use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;

use super::flags::SessionFlags;
use super::session::{Session, SessionContext, SessionOutcome};
use super::types::{ChannelRecord, LiveStatus, Quality};
use crate::infra::config::DaemonConfig;
use crate::infra::errors::RecorderError;
use crate::platform::PlatformStatusClient;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    pub download_folder: String,
    pub default_quality: String,
    pub max_workers: usize,
    pub shutdown_grace: Duration,
    pub status_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            download_folder: config.download_folder.clone(),
            default_quality: config.default_quality.clone(),
            max_workers: config.max_workers.max(1),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
            status_timeout: Duration::from_secs(config.status_timeout_secs.max(1)),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&DaemonConfig::default())
    }
}

/// Result of one poll round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollReport {
    pub checked: usize,
    pub started: Vec<String>,
    pub went_offline: Vec<String>,
    /// The status call failed or timed out; nothing changed this round.
    pub failed: bool,
}

/// `(being captured, watchlisted)` channel logins, sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub watching: Vec<String>,
    pub watchlist: Vec<String>,
}

struct ActiveSession {
    record: ChannelRecord,
    flags: Arc<SessionFlags>,
    /// Quality set by a `register` call that arrived mid-session.
    requeue_quality: Option<Quality>,
}

#[derive(Default)]
struct Registry {
    watchlist: HashMap<String, ChannelRecord>,
    active: HashMap<String, ActiveSession>,
}

/// Owns the watchlist and the active set, and runs every session on a
/// bounded pool.
pub struct LifecycleOrchestrator {
    platform: Arc<dyn PlatformStatusClient>,
    ctx: SessionContext,
    settings: RwLock<OrchestratorSettings>,
    registry: Mutex<Registry>,
    pool: Mutex<JoinSet<()>>,
    permits: Arc<Semaphore>,
    /// Permits one session holds: its capture task plus its chat task.
    session_permits: u32,
    stop_tx: watch::Sender<bool>,
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl LifecycleOrchestrator {
    pub fn new(
        platform: Arc<dyn PlatformStatusClient>,
        ctx: SessionContext,
        settings: OrchestratorSettings,
    ) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Self {
            platform,
            ctx,
            permits: Arc::new(Semaphore::new(settings.max_workers)),
            session_permits: settings.max_workers.min(2) as u32,
            settings: RwLock::new(settings),
            registry: Mutex::new(Registry::default()),
            pool: Mutex::new(JoinSet::new()),
            stop_tx,
        })
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Add a channel to the watchlist, or update the quality a running
    /// session will be re-registered with.
    pub async fn register(&self, name: &str, quality: &str) -> Result<String, RecorderError> {
        let login = normalize_name(name);
        let quality = Quality::parse(quality)?;

        if let Some(active) = self.registry.lock().await.active.get_mut(&login) {
            active.requeue_quality = Some(quality.clone());
            return Ok(format!(
                "{login} is being captured; it will be watched in {quality} quality afterwards."
            ));
        }

        let timeout = self.settings.read().await.status_timeout;
        let resolved = tokio::time::timeout(timeout, self.platform.resolve_ids(&[login.clone()]))
            .await
            .map_err(|_| RecorderError::transport(&login, "channel lookup timed out"))??;
        let info = resolved
            .get(&login)
            .ok_or_else(|| RecorderError::UnknownChannel { name: login.clone() })?;

        let record = ChannelRecord {
            id: info.id.clone(),
            display_name: info.display_name.clone(),
            login_name: login.clone(),
            preferred_quality: quality,
        };

        let mut registry = self.registry.lock().await;
        if let Some(active) = registry.active.get_mut(&login) {
            // Went live while we were resolving.
            active.requeue_quality = Some(record.preferred_quality);
        } else {
            registry.watchlist.insert(login.clone(), record);
        }
        tracing::info!("Added {} to watchlist", login);
        Ok(format!("Successfully added {login} to watchlist."))
    }

    pub async fn unregister(&self, name: &str) -> Result<String, RecorderError> {
        let login = normalize_name(name);
        let mut registry = self.registry.lock().await;
        if registry.watchlist.remove(&login).is_some() {
            tracing::info!("Removed {} from watchlist", login);
            return Ok(format!("Removed {login} from watchlist."));
        }
        match registry.active.get_mut(&login) {
            Some(active) => {
                active.requeue_quality = None;
                active.flags.request_cancel();
                tracing::info!("Cancelling capture of {}", login);
                Ok(format!("Removed {login} from watchlist."))
            }
            None => Err(RecorderError::NotFound { name: login }),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        let registry = self.registry.lock().await;
        let mut watching: Vec<String> = registry.active.keys().cloned().collect();
        let mut watchlist: Vec<String> = registry.watchlist.keys().cloned().collect();
        watching.sort();
        watchlist.sort();
        Snapshot { watching, watchlist }
    }

    /// Returns the interval actually applied (at least one second).
    pub async fn set_interval(&self, secs: u64) -> u64 {
        let secs = secs.max(1);
        self.settings.write().await.poll_interval = Duration::from_secs(secs);
        tracing::info!("Poll interval set to {}s", secs);
        secs
    }

    pub async fn set_download_folder(&self, folder: &str) {
        self.settings.write().await.download_folder = folder.to_string();
        tracing::info!("Download folder set to '{}'", folder);
    }

    pub async fn poll_interval(&self) -> Duration {
        self.settings.read().await.poll_interval
    }

    /// Register every non-blank line of `path` with the default quality.
    /// Returns how many were added.
    pub async fn load_streamers_from_file(&self, path: &Path) -> usize {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "Streamers file {} not loaded ({}); proceeding without it",
                    path.display(),
                    e
                );
                return 0;
            }
        };
        let quality = self.settings.read().await.default_quality.clone();
        let mut added = 0;
        for name in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.register(name, &quality).await {
                Ok(_) => added += 1,
                Err(e) => tracing::warn!("Skipping '{}' from {}: {}", name, path.display(), e),
            }
        }
        added
    }

    /// One status round: start sessions for channels that went live and
    /// signal cleanup to sessions whose channel went offline.
    pub async fn poll_once(self: &Arc<Self>) -> PollReport {
        let mut report = PollReport::default();
        if self.is_stopping() {
            return report;
        }

        let ids: Vec<String> = {
            let registry = self.registry.lock().await;
            registry
                .watchlist
                .values()
                .map(|r| r.id.clone())
                .chain(registry.active.values().map(|a| a.record.id.clone()))
                .collect()
        };
        report.checked = ids.len();
        if ids.is_empty() {
            return report;
        }

        let (timeout, download_folder) = {
            let settings = self.settings.read().await;
            (settings.status_timeout, settings.download_folder.clone())
        };
        let statuses = match tokio::time::timeout(timeout, self.platform.live_status(&ids)).await {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!("Live status check timed out after {:?}", timeout);
                report.failed = true;
                return report;
            }
        };
        let status_of = |id: &str| statuses.get(id).cloned().unwrap_or_else(LiveStatus::offline);

        let mut sessions = Vec::new();
        {
            let mut registry = self.registry.lock().await;
            for (login, active) in registry.active.iter() {
                if !status_of(&active.record.id).is_online() && !active.flags.should_stop() {
                    tracing::info!("{} went offline, signalling cleanup", login);
                    active.flags.request_cleanup();
                    report.went_offline.push(login.clone());
                }
            }

            let live: Vec<String> = registry
                .watchlist
                .iter()
                .filter(|(_, r)| status_of(&r.id).is_online())
                .map(|(login, _)| login.clone())
                .collect();
            for login in live {
                let Some(record) = registry.watchlist.remove(&login) else {
                    continue;
                };
                let session = Session::new(
                    record.clone(),
                    status_of(&record.id),
                    &download_folder,
                    Local::now(),
                );
                registry.active.insert(
                    login.clone(),
                    ActiveSession {
                        record,
                        flags: session.flags(),
                        requeue_quality: None,
                    },
                );
                report.started.push(login);
                sessions.push(session);
            }
        }

        let unstarted = self.spawn_sessions(sessions).await;
        if !unstarted.is_empty() {
            let mut registry = self.registry.lock().await;
            for login in unstarted {
                if let Some(active) = registry.active.remove(&login) {
                    registry.watchlist.insert(login.clone(), active.record);
                }
                report.started.retain(|l| l != &login);
            }
        }
        report.started.sort();
        report.went_offline.sort();
        report
    }

    /// Submit the capture and chat tasks for each session. Sessions that
    /// arrive after shutdown began are handed back unstarted.
    async fn spawn_sessions(self: &Arc<Self>, sessions: Vec<Session>) -> Vec<String> {
        if sessions.is_empty() {
            return Vec::new();
        }
        let mut pool = self.pool.lock().await;
        while pool.try_join_next().is_some() {}

        if self.is_stopping() {
            return sessions
                .iter()
                .map(|s| s.channel().login_name.clone())
                .collect();
        }

        for session in sessions {
            let (done_tx, done_rx) = oneshot::channel();
            let chat = session.chat_task(&self.ctx, done_tx);
            let orchestrator = self.clone();
            let permits = self.permits.clone();
            let needed = self.session_permits;
            pool.spawn(async move {
                // Both halves of the session run under one acquisition.
                let _permits = permits.acquire_many_owned(needed).await.ok();
                let chat = tokio::spawn(chat);
                let outcome = session.run(&orchestrator.ctx, done_rx).await;
                // Finished, or past its flush deadline.
                chat.abort();
                orchestrator.finish_session(outcome).await;
            });
        }
        Vec::new()
    }

    /// Completion callback of a capture task: drop the session from the
    /// active set and put the channel back on the watchlist. A cancelled
    /// session is only re-registered when `register` was called after the
    /// cancel; nothing is re-registered while shutting down.
    async fn finish_session(&self, outcome: SessionOutcome) {
        let SessionOutcome {
            mut channel,
            ended_as,
            cancelled,
            recording,
            job_id,
            error,
        } = outcome;
        let login = channel.login_name.clone();

        match (&recording, job_id) {
            (Some(path), Some(id)) => tracing::info!(
                "[{}] session ended {:?}; job {} for {}",
                login,
                ended_as,
                id,
                path.display()
            ),
            (Some(path), None) => tracing::warn!(
                "[{}] session ended {:?}; {} has no job row",
                login,
                ended_as,
                path.display()
            ),
            (None, _) => tracing::info!(
                "[{}] session ended {:?}{}",
                login,
                ended_as,
                error.map(|e| format!(": {e}")).unwrap_or_default()
            ),
        }

        let mut registry = self.registry.lock().await;
        let requeue = registry
            .active
            .remove(&login)
            .and_then(|a| a.requeue_quality);

        if self.is_stopping() || (cancelled && requeue.is_none()) {
            tracing::info!("Finished watching {}; not re-registering", login);
            return;
        }
        if let Some(quality) = requeue {
            channel.preferred_quality = quality;
        }
        tracing::info!(
            "Finished watching {}; back on watchlist at {} quality",
            login,
            channel.preferred_quality
        );
        registry.watchlist.insert(login, channel);
    }

    /// Poll, then sleep for the current interval, until `shutdown`.
    pub async fn run(self: Arc<Self>) {
        let mut stop_rx = self.stop_tx.subscribe();
        tracing::info!("Poll loop started");
        loop {
            if self.is_stopping() {
                break;
            }
            let report = self.poll_once().await;
            if !report.started.is_empty() {
                tracing::info!("Now capturing: {}", report.started.join(", "));
            }

            let interval = self.poll_interval().await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop_rx.wait_for(|stopping| *stopping) => break,
            }
        }
        tracing::info!("Poll loop stopped");
    }

    /// Stop re-arming, cancel every session, and wait for the pool to drain
    /// (aborting whatever is left after the grace period). Idempotent.
    pub async fn shutdown(&self) {
        self.stop_tx.send_replace(true);

        {
            let registry = self.registry.lock().await;
            for (login, active) in registry.active.iter() {
                tracing::info!("Stopping capture of {}", login);
                active.flags.request_cancel();
            }
        }

        let grace = self.settings.read().await.shutdown_grace;
        let mut pool = self.pool.lock().await;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = pool.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!("Session task panicked: {}", e);
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "{} task(s) still running after {:?}; aborting",
                pool.len(),
                grace
            );
            pool.abort_all();
            while pool.join_next().await.is_some() {}
        }
        tracing::info!("All sessions drained");
    }
}
