// src/api/types.rs

use serde::{Deserialize, Serialize};

/// Request body for adding a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStreamerRequest {
    pub name: String,
    /// Defaults to the daemon's configured quality.
    #[serde(default)]
    pub quality: Option<String>,
}

/// Partial update of runtime settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub download_folder: Option<String>,
}

/// Human-readable outcome of a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub poll_interval_secs: u64,
    pub download_folder: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
