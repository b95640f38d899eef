// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::RecorderError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub highlights: HighlightsConfig,

    #[serde(default)]
    pub clips: ClipsConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    /// HTTP control endpoint (optional section in config.toml).
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub poll_interval_secs: u64,
    /// Recording directory; `#streamer#` is replaced by the channel login.
    pub download_folder: String,
    pub default_quality: String,
    /// Upper bound on concurrently running capture + chat tasks.
    pub max_workers: usize,
    pub shutdown_grace_secs: u64,
    pub status_timeout_secs: u64,
    pub chat_flush_timeout_secs: u64,
    /// One channel name per line, registered at startup.
    pub streamers_file: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            poll_interval_secs: 10,
            download_folder: cwd.join("#streamer#").display().to_string(),
            default_quality: "best".into(),
            max_workers: 16,
            shutdown_grace_secs: 30,
            status_timeout_secs: 20,
            chat_flush_timeout_secs: 15,
            streamers_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: String,
    pub auth_url: String,
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base: "https://api.twitch.tv/helix".into(),
            auth_url: "https://id.twitch.tv/oauth2/token".into(),
            max_retries: 3,
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub streamlink_path: String,
    /// argv of the chat tool; `{url}` is replaced by the channel URL.
    pub chat_command: Vec<String>,
    /// `{login}` is replaced by the channel login.
    pub url_template: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            streamlink_path: "streamlink".into(),
            chat_command: vec![
                "chat_downloader".into(),
                "{url}".into(),
                "--format".into(),
                "json".into(),
                "--quiet".into(),
            ],
            url_template: "https://www.twitch.tv/{login}".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightsConfig {
    pub segment_length_secs: u64,
    /// Minimum matching messages for a segment to count as interesting.
    pub frequency_threshold: usize,
    pub keywords: Vec<String>,
    pub laughter_pattern: String,
    pub output_dir: Option<String>,
}

impl Default for HighlightsConfig {
    fn default() -> Self {
        Self {
            segment_length_secs: 10,
            frequency_threshold: 15,
            keywords: ["ахах", "уфф", "pog", "wow", "lul", "lol", "xdd", "clip", "клип"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            laughter_pattern: r"\b[зфыхаъпha]{2,}\b".into(),
            output_dir: None,
        }
    }
}

impl HighlightsConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::highlights_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipsConfig {
    /// Ascending padding targets; a shorter window is padded up to the first one above it.
    pub min_durations_secs: Vec<u64>,
    pub delete_original_on_success: bool,
    pub delete_if_no_highlights: bool,
    pub save_chat_messages: bool,
    /// Base clip directory (defaults to `<video dir>/Clips`).
    pub storage_path: Option<String>,
    pub video_start_offset_secs: f64,
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            min_durations_secs: vec![90, 180],
            delete_original_on_success: false,
            delete_if_no_highlights: false,
            save_chat_messages: false,
            storage_path: None,
            video_start_offset_secs: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub delete_source_after_transcode: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".into(),
            ffprobe_path: "ffprobe".into(),
            delete_source_after_transcode: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token required on every request when set.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_api_port(),
            token: None,
        }
    }
}

fn default_api_port() -> u16 {
    1234
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> Result<Self, RecorderError> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, RecorderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RecorderError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RecorderError> {
        if self.highlights.segment_length_secs == 0 {
            return Err(RecorderError::Config(
                "highlights.segment_length_secs must be positive".into(),
            ));
        }
        if self.clips.min_durations_secs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RecorderError::Config(
                "clips.min_durations_secs must be strictly ascending".into(),
            ));
        }
        if self.daemon.max_workers == 0 {
            return Err(RecorderError::Config(
                "daemon.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
