// src/clips/extractor.rs — Map highlight windows onto a recording and cut clips

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::highlights::HighlightWindow;
use crate::infra::config::ClipsConfig;
use crate::infra::errors::RecorderError;
use crate::media::MediaTool;
use crate::notify::Notifier;
use crate::util::{format_hhmmss, size_gib};

const MICROS_PER_SEC: i64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct ClipSettings {
    /// Ascending, in seconds.
    pub min_durations_secs: Vec<u64>,
    pub delete_original_on_success: bool,
    pub delete_if_no_highlights: bool,
    pub save_chat_messages: bool,
    pub storage_path: Option<PathBuf>,
    pub video_start_offset_micros: i64,
}

impl ClipSettings {
    pub fn from_config(config: &ClipsConfig) -> Self {
        Self {
            min_durations_secs: config.min_durations_secs.clone(),
            delete_original_on_success: config.delete_original_on_success,
            delete_if_no_highlights: config.delete_if_no_highlights,
            save_chat_messages: config.save_chat_messages,
            storage_path: config.storage_path.as_ref().map(PathBuf::from),
            video_start_offset_micros: (config.video_start_offset_secs * 1_000_000.0) as i64,
        }
    }
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self::from_config(&ClipsConfig::default())
    }
}

/// A slice of the recording on its own 0-based timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub source_video: PathBuf,
    pub start_timecode: String,
    pub end_timecode: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipFailure {
    pub window: usize,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ExtractionReport {
    pub clips: Vec<Clip>,
    pub failures: Vec<ClipFailure>,
    /// The recording had no highlight windows at all.
    pub no_highlights: bool,
    pub original_deleted: bool,
}

/// Pad `[start, end]` symmetrically up to the first minimum duration that
/// is longer than it. The odd microsecond goes to the end.
pub fn pad(start: i64, end: i64, min_durations_secs: &[u64]) -> (i64, i64) {
    let duration = end - start;
    let target = min_durations_secs
        .iter()
        .map(|s| *s as i64 * MICROS_PER_SEC)
        .find(|t| duration < *t);
    match target {
        Some(t) => {
            let deficit = t - duration;
            let before = deficit / 2;
            (start - before, end + (deficit - before))
        }
        None => (start, end),
    }
}

/// Clamp each side into `[0, video_duration]` independently; `end` never
/// drops below `start`.
pub fn clamp(start: i64, end: i64, video_duration: i64) -> (i64, i64) {
    let limit = video_duration.max(0);
    let start = start.clamp(0, limit);
    let end = end.min(limit).max(start);
    (start, end)
}

/// Window bounds → padded and clamped `(start, end)` on the video timeline.
pub fn plan_span(
    window: &HighlightWindow,
    settings: &ClipSettings,
    video_duration: i64,
) -> (i64, i64) {
    let offset = settings.video_start_offset_micros;
    let start = (window.start - offset).max(0);
    let end = (window.end - offset).max(start);
    let (start, end) = pad(start, end, &settings.min_durations_secs);
    clamp(start, end, video_duration)
}

/// Parsed `"<YYYY-MM-DD HH.MM.SS> - <streamer> - ..."` recording name.
fn parse_recording_name(video: &Path) -> Option<(NaiveDateTime, String)> {
    let name = video.file_name()?.to_string_lossy().into_owned();
    let mut parts = name.split(" - ");
    let date = NaiveDateTime::parse_from_str(parts.next()?, "%Y-%m-%d %H.%M.%S").ok()?;
    let streamer = parts.next()?.split('.').next()?.trim().to_string();
    if streamer.is_empty() {
        return None;
    }
    Some((date, streamer))
}

/// `<base>/<streamer>/<YYYY-MM-DD>`, where `base` defaults to `<video dir>/Clips`.
pub fn clip_dir_for(video: &Path, storage_path: Option<&Path>) -> PathBuf {
    let base = match storage_path {
        Some(p) => p.to_path_buf(),
        None => video
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("Clips"),
    };
    match parse_recording_name(video) {
        Some((date, streamer)) => base.join(streamer).join(date.format("%Y-%m-%d").to_string()),
        None => {
            tracing::warn!(
                "Unexpected recording name {}; clips go under its stem",
                video.display()
            );
            let stem = video
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "clips".into());
            base.join(stem)
        }
    }
}

pub struct ClipExtractor {
    media: Arc<dyn MediaTool>,
    notifier: Arc<dyn Notifier>,
    settings: ClipSettings,
}

impl ClipExtractor {
    pub fn new(media: Arc<dyn MediaTool>, notifier: Arc<dyn Notifier>, settings: ClipSettings) -> Self {
        Self {
            media,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &ClipSettings {
        &self.settings
    }

    /// Cut one clip per window. A failed slice is recorded and the batch
    /// continues; only a failed probe aborts.
    pub async fn extract(
        &self,
        video: &Path,
        windows: &[HighlightWindow],
    ) -> Result<ExtractionReport, RecorderError> {
        let started = Instant::now();
        let mut report = ExtractionReport::default();

        let streamer = parse_recording_name(video)
            .map(|(_, s)| s)
            .unwrap_or_else(|| video.display().to_string());
        let size = tokio::fs::metadata(video).await.map(|m| m.len()).unwrap_or(0);
        self.notifier
            .notify(
                &format!(
                    "Starting processing for streamer: {streamer}\nFile size: {:.2} GB",
                    size_gib(size)
                ),
                false,
            )
            .await;
        self.notifier
            .notify(&format!("Total timeframes from chat: {}", windows.len()), false)
            .await;

        if windows.is_empty() {
            report.no_highlights = true;
            if self.settings.delete_if_no_highlights {
                self.notifier
                    .notify(
                        &format!(
                            "No interesting segments found in chat for video {}",
                            video.display()
                        ),
                        true,
                    )
                    .await;
            }
            return Ok(report);
        }

        let video_duration = match self.media.probe(video).await {
            Ok(info) => info.duration_micros(),
            Err(e) => {
                self.notifier
                    .notify(&format!("Error getting video duration: {e}"), true)
                    .await;
                return Err(e);
            }
        };

        let clip_dir = clip_dir_for(video, self.settings.storage_path.as_deref());
        tokio::fs::create_dir_all(&clip_dir)
            .await
            .map_err(|e| RecorderError::write(&clip_dir, e))?;

        for (index, window) in windows.iter().enumerate() {
            let (start, end) = plan_span(window, &self.settings, video_duration);
            let start_timecode = format_hhmmss(start);
            let end_timecode = format_hhmmss(end);
            let output_path = clip_dir.join(format!(
                "clip_{:03}_{}.mp4",
                index + 1,
                start_timecode.replace(':', "")
            ));
            tracing::info!(
                "Window {}: [{}, {}] -> {} .. {}",
                index + 1,
                window.start,
                window.end,
                start_timecode,
                end_timecode
            );

            match self
                .media
                .slice(video, &start_timecode, &end_timecode, &output_path)
                .await
            {
                Ok(()) => {
                    if self.settings.save_chat_messages {
                        if let Err(e) = write_excerpt(&output_path, window).await {
                            tracing::warn!(
                                "Could not save chat excerpt for {}: {}",
                                output_path.display(),
                                e
                            );
                        }
                    }
                    report.clips.push(Clip {
                        source_video: video.to_path_buf(),
                        start_timecode,
                        end_timecode,
                        output_path,
                    });
                }
                Err(e) => {
                    self.notifier
                        .notify(&format!("Error slicing video: {e}"), true)
                        .await;
                    report.failures.push(ClipFailure {
                        window: index,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.notifier
            .notify(
                &format!(
                    "Processing completed in {:.2} seconds\nProcessing results: {} successful, {} failed",
                    started.elapsed().as_secs_f64(),
                    report.clips.len(),
                    report.failures.len()
                ),
                false,
            )
            .await;

        if self.settings.delete_original_on_success && report.failures.is_empty() {
            match tokio::fs::remove_file(video).await {
                Ok(()) => {
                    tracing::info!("Deleted original recording {}", video.display());
                    report.original_deleted = true;
                }
                Err(e) => tracing::warn!("Could not delete {}: {}", video.display(), e),
            }
        }
        Ok(report)
    }
}

/// `<clip stem>_chat.json` next to the clip.
async fn write_excerpt(clip: &Path, window: &HighlightWindow) -> Result<(), RecorderError> {
    let stem = clip
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = clip.with_file_name(format!("{stem}_chat.json"));
    let json = serde_json::to_string_pretty(&window.messages)
        .map_err(|e| RecorderError::Other(e.into()))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| RecorderError::write(&path, e))
}
