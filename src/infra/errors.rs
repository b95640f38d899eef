// src/infra/errors.rs — Error types for livecap

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    // Registration errors
    #[error("Unknown channel '{name}'")]
    UnknownChannel { name: String },

    #[error("Invalid quality '{quality}'. Quality options: {options}")]
    InvalidQuality { quality: String, options: String },

    #[error("Channel '{name}' is neither watchlisted nor being captured")]
    NotFound { name: String },

    // Capture errors
    #[error("Quality '{requested}' unavailable for '{channel}'")]
    QualityUnavailable { channel: String, requested: String },

    #[error("Stream for '{channel}' ended")]
    StreamEndedNaturally { channel: String },

    #[error("Transport error for '{channel}': {message}")]
    Transport { channel: String, message: String },

    #[error("Failed to write '{path}': {message}")]
    Write { path: String, message: String },

    // External tools
    #[error("{tool} failed (exit code {code:?}): {message}")]
    ToolInvocation {
        tool: String,
        code: Option<i32>,
        message: String,
    },

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RecorderError {
    /// Errors that are handled locally and never end a session on their own.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecorderError::QualityUnavailable { .. } | RecorderError::StreamEndedNaturally { .. }
        )
    }

    /// Errors that get surfaced to the notification sink.
    pub fn should_notify(&self) -> bool {
        matches!(
            self,
            RecorderError::Transport { .. }
                | RecorderError::Write { .. }
                | RecorderError::ToolInvocation { .. }
        )
    }

    pub fn transport(channel: &str, err: impl std::fmt::Display) -> Self {
        RecorderError::Transport {
            channel: channel.to_string(),
            message: err.to_string(),
        }
    }

    pub fn write(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        RecorderError::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
