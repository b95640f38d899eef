// src/pipeline.rs — Batch post-processing of recorded jobs (detect + clip)

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clips::{ClipExtractor, ClipSettings};
use crate::highlights::{self, DetectorConfig};
use crate::infra::config::Config;
use crate::jobs::{JobOutcome, JobRow, JobTable};
use crate::media::MediaTool;
use crate::notify::Notifier;

pub struct PipelineContext {
    pub jobs: Arc<dyn JobTable>,
    pub media: Arc<dyn MediaTool>,
    pub notifier: Arc<dyn Notifier>,
    pub detector: DetectorConfig,
    pub clips: ClipSettings,
    /// Where highlight-window files are written.
    pub windows_dir: PathBuf,
}

impl PipelineContext {
    pub fn from_config(
        config: &Config,
        jobs: Arc<dyn JobTable>,
        media: Arc<dyn MediaTool>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            jobs,
            media,
            notifier,
            detector: DetectorConfig::from_config(&config.highlights)?,
            clips: ClipSettings::from_config(&config.clips),
            windows_dir: config.highlights.output_dir(),
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    /// Recordings discarded for having no highlights.
    pub skipped: usize,
}

fn non_empty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Run detection and extraction for every pending job.
pub async fn process_pending(ctx: &PipelineContext) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let pending = ctx.jobs.pending().await?;
    tracing::info!("{} pending job(s)", pending.len());

    for job in pending {
        tracing::info!("Starting processing for job {}", job.id);
        let outcome = process_job(ctx, &job).await;
        match outcome {
            Some(JobOutcome::Processed) => summary.processed += 1,
            Some(_) => summary.failed += 1,
            None => summary.skipped += 1,
        }
        if let Some(outcome) = outcome {
            ctx.jobs.mark_outcome(job.id, outcome).await?;
        }
        tracing::info!("Finished job {}: {:?}", job.id, outcome);
    }
    Ok(summary)
}

/// `None` means the job was discarded and its row removed.
async fn process_job(ctx: &PipelineContext, job: &JobRow) -> Option<JobOutcome> {
    let video = PathBuf::from(&job.media_path);
    let transcript = PathBuf::from(&job.transcript_path);

    let video_ok = non_empty(&video);
    let chat_ok = non_empty(&transcript);
    if !video_ok || !chat_ok {
        let which = if !video_ok { "Video file" } else { "Chat file" };
        let message = format!("Missing or empty file for job {}: {}", job.id, which);
        tracing::error!("{}", message);
        ctx.notifier.notify(&message, true).await;
        return Some(JobOutcome::Failed);
    }

    let windows = match detect_windows(ctx, &transcript) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("Highlight detection failed for job {}: {}", job.id, e);
            return Some(JobOutcome::Failed);
        }
    };
    let windows_file = highlights::windows_path_for(&ctx.windows_dir, &transcript);
    if let Err(e) = highlights::save_windows(&windows_file, &windows) {
        tracing::warn!("Could not save {}: {}", windows_file.display(), e);
    }

    let extractor = ClipExtractor::new(ctx.media.clone(), ctx.notifier.clone(), ctx.clips.clone());
    let report = match extractor.extract(&video, &windows).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Clip extraction failed for job {}: {}", job.id, e);
            return Some(JobOutcome::Failed);
        }
    };

    if report.no_highlights && ctx.clips.delete_if_no_highlights {
        discard(ctx, job, &video, &windows_file).await;
        return None;
    }
    if report.failures.is_empty() {
        Some(JobOutcome::Processed)
    } else {
        Some(JobOutcome::Failed)
    }
}

fn detect_windows(
    ctx: &PipelineContext,
    transcript: &Path,
) -> Result<Vec<highlights::HighlightWindow>, crate::infra::errors::RecorderError> {
    highlights::repair_transcript(transcript)?;
    let messages = highlights::load_transcript(transcript)?;
    let windows = highlights::detect(&messages, &ctx.detector);
    tracing::info!(
        "{}: {} messages, {} highlight window(s)",
        transcript.display(),
        messages.len(),
        windows.len()
    );
    Ok(windows)
}

async fn discard(ctx: &PipelineContext, job: &JobRow, video: &Path, windows_file: &Path) {
    for path in [video, windows_file] {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Could not delete {}: {}", path.display(), e);
        }
    }
    if let Err(e) = ctx.jobs.delete(&job.media_path).await {
        tracing::error!("Failed to delete job row for {}: {}", job.media_path, e);
        ctx.notifier
            .notify(&format!("Failed to delete record for video {}: {e}", job.media_path), true)
            .await;
    }
    tracing::info!("Discarded {} (no highlights)", video.display());
}
