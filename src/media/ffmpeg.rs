// src/media/ffmpeg.rs — MediaTool backed by the ffmpeg / ffprobe binaries

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{MediaTool, ProbeInfo, TranscodeOptions};
use crate::infra::config::MediaConfig;
use crate::infra::errors::RecorderError;
use crate::util::truncate_str;

pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
}

impl Ffmpeg {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
        }
    }

    /// Whether both binaries can be found.
    pub fn available(&self) -> bool {
        which::which(&self.ffmpeg).is_ok() && which::which(&self.ffprobe).is_ok()
    }

    async fn run(&self, tool: &str, args: &[String]) -> Result<String, RecorderError> {
        let output = Command::new(tool)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RecorderError::ToolInvocation {
                tool: tool.to_string(),
                code: None,
                message: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!("{} stderr: {}", tool, truncate_str(&stderr, 2000));

        if !output.status.success() {
            let tail = stderr.lines().rev().take(5).collect::<Vec<_>>();
            let message = tail.into_iter().rev().collect::<Vec<_>>().join(" | ");
            return Err(RecorderError::ToolInvocation {
                tool: tool.to_string(),
                code: output.status.code(),
                message,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn transcode_args(input: &Path, output: &Path, options: &TranscodeOptions) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        input.display().to_string(),
        "-c:v".into(),
        options.video_codec.clone(),
        "-c:a".into(),
        options.audio_codec.clone(),
        "-b:a".into(),
        format!("{}k", options.audio_bitrate_k),
        "-ar".into(),
        options.audio_sample_rate.to_string(),
        "-ac".into(),
        options.audio_channels.to_string(),
        "-f".into(),
        "mp4".into(),
        output.display().to_string(),
    ]
}

fn slice_args(input: &Path, start: &str, end: &str, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        input.display().to_string(),
        "-ss".into(),
        start.to_string(),
        "-to".into(),
        end.to_string(),
        "-c".into(),
        "copy".into(),
        output.display().to_string(),
    ]
}

fn parse_duration(tool: &str, stdout: &str) -> Result<f64, RecorderError> {
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|_| RecorderError::ToolInvocation {
            tool: tool.to_string(),
            code: Some(0),
            message: format!("unparsable duration '{}'", truncate_str(stdout.trim(), 80)),
        })
}

#[async_trait]
impl MediaTool for Ffmpeg {
    async fn probe(&self, file: &Path) -> Result<ProbeInfo, RecorderError> {
        let args = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            file.display().to_string(),
        ];
        let stdout = self.run(&self.ffprobe, &args).await?;
        Ok(ProbeInfo {
            duration_secs: parse_duration(&self.ffprobe, &stdout)?,
        })
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &TranscodeOptions,
    ) -> Result<(), RecorderError> {
        self.run(&self.ffmpeg, &transcode_args(input, output, options))
            .await
            .map(|_| ())
    }

    async fn slice(
        &self,
        input: &Path,
        start: &str,
        end: &str,
        output: &Path,
    ) -> Result<(), RecorderError> {
        self.run(&self.ffmpeg, &slice_args(input, start, end, output))
            .await
            .map(|_| ())
    }
}
