// src/cli/postprocess.rs — Offline highlight detection and clipping commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::clips::{ClipExtractor, ClipFailure, ClipSettings};
use crate::highlights::{self, DetectorConfig};
use crate::infra::config::Config;
use crate::jobs::{self, JobTable};
use crate::media::ffmpeg::Ffmpeg;
use crate::media::MediaTool;
use crate::notify;
use crate::pipeline::{self, PipelineContext};

fn media_tool(config: &Config) -> anyhow::Result<Arc<dyn MediaTool>> {
    let ffmpeg = Ffmpeg::new(&config.media);
    if !ffmpeg.available() {
        anyhow::bail!(
            "ffmpeg/ffprobe not found (looked for '{}' and '{}')",
            config.media.ffmpeg_path,
            config.media.ffprobe_path
        );
    }
    Ok(Arc::new(ffmpeg))
}

/// `livecap highlights <transcript>`: detect windows and write them to disk.
pub async fn run_highlights(
    config: &Config,
    transcript: &Path,
    output: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let detector = DetectorConfig::from_config(&config.highlights)?;
    let repaired = highlights::repair_transcript(transcript)?;
    if repaired > 0 {
        tracing::info!("Dropped {} malformed line(s) from {}", repaired, transcript.display());
    }
    let messages = highlights::load_transcript(transcript)?;
    let windows = highlights::detect(&messages, &detector);

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => highlights::windows_path_for(&config.highlights.output_dir(), transcript),
    };
    highlights::save_windows(&path, &windows)?;

    println!(
        "{} messages, {} highlight window(s) -> {}",
        messages.len(),
        windows.len(),
        path.display()
    );
    Ok(path)
}

/// Failed windows are reported 1-based, like the clip numbers.
fn format_failure(failure: &ClipFailure) -> String {
    format!("  failed window {}: {}", failure.window + 1, failure.message)
}

/// `livecap clip <video> <windows.json>`
pub async fn run_clip(config: &Config, video: &Path, windows_file: &Path) -> anyhow::Result<()> {
    let windows = highlights::load_windows(windows_file)?;
    let extractor = ClipExtractor::new(
        media_tool(config)?,
        notify::from_config(&config.notify),
        ClipSettings::from_config(&config.clips),
    );
    let report = extractor.extract(video, &windows).await?;

    if report.no_highlights {
        println!("No highlight windows in {}", windows_file.display());
        return Ok(());
    }
    for clip in &report.clips {
        println!(
            "  {} .. {}  {}",
            clip.start_timecode,
            clip.end_timecode,
            clip.output_path.display()
        );
    }
    for failure in &report.failures {
        eprintln!("{}", format_failure(failure));
    }
    println!(
        "{} clip(s), {} failure(s){}",
        report.clips.len(),
        report.failures.len(),
        if report.original_deleted {
            ", original deleted"
        } else {
            ""
        }
    );
    Ok(())
}

/// `livecap process`: drain the pending job table.
pub async fn run_process(config: &Config) -> anyhow::Result<()> {
    let store = jobs::open(&crate::infra::paths::db_path())?;
    let (handle, _server) = jobs::spawn_job_server(store);
    let jobs: Arc<dyn JobTable> = Arc::new(handle);

    let ctx = PipelineContext::from_config(
        config,
        jobs,
        media_tool(config)?,
        notify::from_config(&config.notify),
    )?;
    let summary = pipeline::process_pending(&ctx).await?;
    println!(
        "Processed {}, failed {}, skipped {}",
        summary.processed, summary.failed, summary.skipped
    );
    Ok(())
}
