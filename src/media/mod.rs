// src/media/mod.rs — Transcode / slice / probe collaborator

pub mod ffmpeg;

use async_trait::async_trait;
use std::path::Path;

use crate::infra::errors::RecorderError;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub duration_secs: f64,
}

impl ProbeInfo {
    pub fn duration_micros(&self) -> i64 {
        (self.duration_secs * 1_000_000.0).floor() as i64
    }
}

/// Audio/video settings for turning a raw capture into the kept recording.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeOptions {
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate_k: u32,
    pub audio_sample_rate: u32,
    pub audio_channels: u32,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            video_codec: "copy".into(),
            audio_codec: "aac".into(),
            audio_bitrate_k: 192,
            audio_sample_rate: 48_000,
            audio_channels: 2,
        }
    }
}

/// Blocking file-in/file-out media operations. Failures carry the tool's exit code.
#[async_trait]
pub trait MediaTool: Send + Sync {
    async fn probe(&self, file: &Path) -> Result<ProbeInfo, RecorderError>;

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &TranscodeOptions,
    ) -> Result<(), RecorderError>;

    /// Cut `[start, end]` (both `HH:MM:SS`) out of `input`.
    async fn slice(
        &self,
        input: &Path,
        start: &str,
        end: &str,
        output: &Path,
    ) -> Result<(), RecorderError>;
}
