// src/core/session.rs — One channel's capture session, from going live to retirement

use chrono::{DateTime, Local};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::capture::{self, CaptureReport, CaptureSource, ChatSource};
use crate::core::flags::SessionFlags;
use crate::core::types::{ChannelRecord, LiveStatus, Quality};
use crate::infra::config::Config;
use crate::infra::errors::RecorderError;
use crate::jobs::JobTable;
use crate::media::{MediaTool, TranscodeOptions};
use crate::notify::Notifier;
use crate::util::{size_gib, valid_filename};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    /// Capture finished with data on disk.
    Ended,
    /// Capture never produced useful output, or the disk failed under it.
    Failed,
    Converting,
    Retired,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub chat_flush_timeout: Duration,
    pub delete_source_after_transcode: bool,
    pub transcode: TranscodeOptions,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chat_flush_timeout: Duration::from_secs(config.daemon.chat_flush_timeout_secs),
            delete_source_after_transcode: config.media.delete_source_after_transcode,
            transcode: TranscodeOptions::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Collaborators every session needs. Cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    pub capture: Arc<dyn CaptureSource>,
    pub chat: Arc<dyn ChatSource>,
    pub media: Arc<dyn MediaTool>,
    pub jobs: Arc<dyn JobTable>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: SessionSettings,
}

/// What the orchestrator needs to know once a session is retired.
#[derive(Debug)]
pub struct SessionOutcome {
    /// The record, carrying any fallback quality chosen during the session.
    pub channel: ChannelRecord,
    pub ended_as: SessionState,
    pub cancelled: bool,
    /// Final media file that was recorded in the job table.
    pub recording: Option<PathBuf>,
    pub job_id: Option<i64>,
    pub error: Option<RecorderError>,
}

pub struct Session {
    id: uuid::Uuid,
    channel: ChannelRecord,
    live: LiveStatus,
    output_path: PathBuf,
    transcript_path: PathBuf,
    flags: Arc<SessionFlags>,
    state: SessionState,
}

/// Pick the quality to capture at. `None` when nothing is offered at all.
pub fn choose_quality(requested: &Quality, available: &[String]) -> Option<Quality> {
    if available.iter().any(|q| q == requested.as_str()) {
        return Some(requested.clone());
    }
    if available.iter().any(|q| q == Quality::BEST) {
        return Some(Quality::best());
    }
    available.last().map(|q| Quality::reported(q.clone()))
}

/// `<folder with #streamer# replaced>/<timestamp> - <display> - <title>.ts`
pub fn recording_path(
    download_folder: &str,
    channel: &ChannelRecord,
    title: &str,
    started: DateTime<Local>,
) -> PathBuf {
    let dir = PathBuf::from(download_folder.replace("#streamer#", &channel.login_name));
    let name = format!(
        "{} - {} - {}.ts",
        started.format("%Y-%m-%d %H.%M.%S"),
        channel.display_name,
        valid_filename(title)
    );
    dir.join(name)
}

pub fn transcript_path_for(recording: &Path) -> PathBuf {
    let stem = recording
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    recording.with_file_name(format!("{stem}_chat.jsonl"))
}

impl Session {
    pub fn new(
        channel: ChannelRecord,
        live: LiveStatus,
        download_folder: &str,
        started: DateTime<Local>,
    ) -> Self {
        let title = live.title.clone().unwrap_or_else(|| "No Title".into());
        let output_path = recording_path(download_folder, &channel, &title, started);
        let transcript_path = transcript_path_for(&output_path);
        Self {
            id: uuid::Uuid::new_v4(),
            channel,
            live,
            output_path,
            transcript_path,
            flags: Arc::new(SessionFlags::new()),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn channel(&self) -> &ChannelRecord {
        &self.channel
    }

    pub fn flags(&self) -> Arc<SessionFlags> {
        self.flags.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn transcript_path(&self) -> &Path {
        &self.transcript_path
    }

    fn transition(&mut self, next: SessionState) {
        tracing::info!(
            "[{}] session {}: {:?} -> {:?}",
            self.channel.login_name,
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    /// The chat half of the session, ready to spawn. `done` fires once the
    /// transcript is flushed and closed.
    pub fn chat_task(
        &self,
        ctx: &SessionContext,
        done: oneshot::Sender<()>,
    ) -> impl Future<Output = ()> + Send + 'static {
        let source = ctx.chat.clone();
        let notifier = ctx.notifier.clone();
        let channel = self.channel.clone();
        let path = self.transcript_path.clone();
        let flags = self.flags.clone();
        async move {
            if !flags.should_stop() {
                notifier
                    .notify(&format!("New chat download for {}", channel.display_name), false)
                    .await;
            }
            let report = capture::run_chat_capture(source.as_ref(), &channel, &path, &flags).await;
            match report.error {
                Some(e) => tracing::warn!(
                    "[{}] chat capture stopped after {} messages: {}",
                    channel.login_name,
                    report.messages,
                    e
                ),
                None => tracing::info!(
                    "[{}] chat capture finished with {} messages",
                    channel.login_name,
                    report.messages
                ),
            }
            let _ = done.send(());
        }
    }

    /// Match the preferred quality against what is offered right now,
    /// persisting a fallback onto the record.
    pub async fn resolve_quality(&mut self, ctx: &SessionContext) -> Result<Quality, RecorderError> {
        let available = ctx.capture.available_qualities(&self.channel).await?;
        let requested = self.channel.preferred_quality.clone();
        let chosen = choose_quality(&requested, &available).ok_or_else(|| {
            RecorderError::StreamEndedNaturally {
                channel: self.channel.login_name.clone(),
            }
        })?;
        if chosen != requested {
            let unavailable = RecorderError::QualityUnavailable {
                channel: self.channel.login_name.clone(),
                requested: requested.to_string(),
            };
            tracing::warn!("{}, falling back to '{}'", unavailable, chosen);
            self.channel.preferred_quality = chosen.clone();
        }
        Ok(chosen)
    }

    async fn capture(&mut self, ctx: &SessionContext) -> CaptureReport {
        if let Some(dir) = self.output_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                return CaptureReport::failed(RecorderError::write(dir, e));
            }
        }

        let quality = match self.resolve_quality(ctx).await {
            Ok(q) => q,
            Err(e) => return CaptureReport::failed(e),
        };
        if self.flags.should_stop() {
            return CaptureReport::stopped();
        }

        ctx.notifier
            .notify(&format!("{} is live. Saving stream", self.channel.display_name), false)
            .await;
        tracing::info!(
            "[{}] saving '{}' in {} quality to {}",
            self.channel.login_name,
            self.live.title.as_deref().unwrap_or_default(),
            quality,
            self.output_path.display()
        );

        let stream = match ctx.capture.open(&self.channel, &quality).await {
            Ok(s) => s,
            Err(e) => return CaptureReport::failed(e),
        };
        capture::run_capture(&self.channel.login_name, stream, &self.output_path, &self.flags).await
    }

    /// Drive the session to retirement. This is the only place that decides
    /// conversion; the orchestrator decides re-registration from the outcome.
    pub async fn run(mut self, ctx: &SessionContext, chat_done: oneshot::Receiver<()>) -> SessionOutcome {
        self.transition(SessionState::Capturing);
        let report = self.capture(ctx).await;

        // Whatever ended the capture also ends the chat.
        self.flags.request_cleanup();
        if tokio::time::timeout(ctx.settings.chat_flush_timeout, chat_done)
            .await
            .is_err()
        {
            tracing::warn!(
                "[{}] chat capture did not finish within {:?}",
                self.channel.login_name,
                ctx.settings.chat_flush_timeout
            );
        }

        let cancelled = self.flags.cancel_requested();
        let CaptureReport { bytes_written, end } = report;
        let error = match end {
            capture::CaptureEnd::Failed(e) => Some(e),
            _ => None,
        };

        if let Some(ref e) = error {
            if e.should_notify() {
                let urgent = matches!(e, RecorderError::Write { .. });
                ctx.notifier
                    .notify(&format!("{}: {}", self.channel.display_name, e), urgent)
                    .await;
            }
            if e.is_recoverable() {
                tracing::info!("[{}] {}", self.channel.login_name, e);
            } else {
                tracing::error!("[{}] {}", self.channel.login_name, e);
            }
        }

        let disk_failed = matches!(error, Some(RecorderError::Write { .. }));
        let ended_as = if bytes_written == 0 || disk_failed {
            SessionState::Failed
        } else {
            SessionState::Ended
        };
        self.transition(ended_as);

        let mut recording = None;
        let mut job_id = None;
        if ended_as == SessionState::Failed {
            if disk_failed {
                tracing::warn!(
                    "[{}] keeping partial recording {}",
                    self.channel.login_name,
                    self.output_path.display()
                );
            } else {
                self.discard(ctx).await;
            }
        } else {
            self.transition(SessionState::Converting);
            let media = match self.convert(ctx).await {
                Ok(mp4) => mp4,
                Err(e) => {
                    tracing::error!("[{}] conversion failed: {}", self.channel.login_name, e);
                    ctx.notifier
                        .notify(
                            &format!("Conversion failed for {}: {}", self.output_path.display(), e),
                            true,
                        )
                        .await;
                    self.output_path.clone()
                }
            };
            match ctx
                .jobs
                .insert(
                    &media.display().to_string(),
                    &self.transcript_path.display().to_string(),
                    Some(&self.channel.login_name),
                )
                .await
            {
                Ok(id) => job_id = Some(id),
                Err(e) => tracing::error!(
                    "[{}] could not record job for {}: {}",
                    self.channel.login_name,
                    media.display(),
                    e
                ),
            }
            recording = Some(media);
        }

        self.transition(SessionState::Retired);
        SessionOutcome {
            channel: self.channel,
            ended_as,
            cancelled,
            recording,
            job_id,
            error,
        }
    }

    async fn discard(&self, ctx: &SessionContext) {
        if !self.output_path.exists() {
            return;
        }
        match tokio::fs::remove_file(&self.output_path).await {
            Ok(()) => {
                tracing::info!("Removed file: {}", self.output_path.display());
                ctx.notifier
                    .notify(
                        &format!(
                            "{}: discarded recording {}",
                            self.channel.display_name,
                            self.output_path.display()
                        ),
                        false,
                    )
                    .await;
            }
            Err(e) => tracing::warn!(
                "Could not remove {}: {}",
                self.output_path.display(),
                e
            ),
        }
    }

    /// `.ts` → `.mp4`. Returns the path of the converted file.
    async fn convert(&self, ctx: &SessionContext) -> Result<PathBuf, RecorderError> {
        let raw = &self.output_path;
        let raw_size = tokio::fs::metadata(raw).await.map(|m| m.len()).unwrap_or(0);
        match ctx.media.probe(raw).await {
            Ok(info) => {
                ctx.notifier
                    .notify(
                        &format!(
                            "File: {}\nOriginal size: {} GB, duration: {:.2} seconds",
                            raw.display(),
                            size_gib(raw_size),
                            info.duration_secs
                        ),
                        false,
                    )
                    .await;
            }
            Err(e) => tracing::warn!("[{}] probe failed: {}", self.channel.login_name, e),
        }

        let mp4 = raw.with_extension("mp4");
        let started = Instant::now();
        ctx.media
            .transcode(raw, &mp4, &ctx.settings.transcode)
            .await?;

        let new_size = tokio::fs::metadata(&mp4).await.map(|m| m.len()).unwrap_or(0);
        ctx.notifier
            .notify(
                &format!(
                    "Converting finished in {:.2} seconds.\nNew MP4 size: {} GB",
                    started.elapsed().as_secs_f64(),
                    size_gib(new_size)
                ),
                false,
            )
            .await;

        if ctx.settings.delete_source_after_transcode {
            match tokio::fs::remove_file(raw).await {
                Ok(()) => tracing::info!("Deleted original file: {}", raw.display()),
                Err(e) => tracing::warn!("Could not delete {}: {}", raw.display(), e),
            }
        }
        Ok(mp4)
    }
}
