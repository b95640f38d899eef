// src/core/types.rs — Shared domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::infra::errors::RecorderError;

/// Quality names accepted at registration time.
pub const KNOWN_QUALITIES: &[&str] = &[
    "best",
    "1080p60",
    "1080p",
    "720p60",
    "720p",
    "480p",
    "360p",
    "160p",
    "audio_only",
    "worst",
];

/// A stream quality label as understood by the capture tool.
///
/// Operator input is validated against [`KNOWN_QUALITIES`]; a fallback chosen
/// from what the capture tool reports may be any label it lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality(String);

impl Quality {
    pub const BEST: &'static str = "best";

    pub fn best() -> Self {
        Self(Self::BEST.to_string())
    }

    /// Validate an operator-supplied quality.
    pub fn parse(raw: &str) -> Result<Self, RecorderError> {
        let normalized = raw.trim().to_lowercase();
        if KNOWN_QUALITIES.contains(&normalized.as_str()) {
            Ok(Self(normalized))
        } else {
            Err(RecorderError::InvalidQuality {
                quality: raw.to_string(),
                options: KNOWN_QUALITIES.join(", "),
            })
        }
    }

    /// Accept a label reported by the capture tool as-is.
    pub fn reported(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered channel. Lives in the watchlist or inside one active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub display_name: String,
    pub login_name: String,
    pub preferred_quality: Quality,
}

/// Identity returned by the platform when resolving a channel name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub login: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Online,
    Offline,
}

/// Per-channel live status from one platform round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub state: StreamState,
    pub title: Option<String>,
    pub viewer_count: Option<u64>,
    pub started_at: Option<String>,
}

impl LiveStatus {
    pub fn offline() -> Self {
        Self {
            state: StreamState::Offline,
            title: None,
            viewer_count: None,
            started_at: None,
        }
    }

    pub fn online(title: impl Into<String>) -> Self {
        Self {
            state: StreamState::Online,
            title: Some(title.into()),
            viewer_count: None,
            started_at: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.state == StreamState::Online
    }
}

/// One chat record, in the persisted transcript format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Microseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub message_type: String,
}

impl ChatMessage {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            message_type: "text_message".into(),
        }
    }
}
