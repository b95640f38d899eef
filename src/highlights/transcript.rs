// src/highlights/transcript.rs — Transcript and highlight-window file I/O

use std::path::{Path, PathBuf};

use super::detector::HighlightWindow;
use crate::core::types::ChatMessage;
use crate::infra::errors::RecorderError;

/// Read a JSON-lines transcript. Lines that do not decode are skipped.
pub fn load_transcript(path: &Path) -> Result<Vec<ChatMessage>, RecorderError> {
    let content = std::fs::read_to_string(path)?;
    let mut messages = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatMessage>(line) {
            Ok(m) => messages.push(m),
            Err(e) => tracing::warn!(
                "{}:{}: skipping undecodable chat line: {}",
                path.display(),
                lineno + 1,
                e
            ),
        }
    }
    Ok(messages)
}

/// Drop blank lines and a truncated final record (left behind when the chat
/// task was interrupted mid-write), rewriting the file in place.
/// Returns the number of lines removed.
pub fn repair_transcript(path: &Path) -> Result<usize, RecorderError> {
    let content = std::fs::read_to_string(path)?;
    let total = content.lines().count();
    let mut kept: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if let Some(last) = kept.last() {
        if serde_json::from_str::<serde_json::Value>(last).is_err() {
            kept.pop();
        }
    }

    let removed = total - kept.len();
    if removed > 0 {
        let mut repaired = kept.join("\n");
        if !repaired.is_empty() {
            repaired.push('\n');
        }
        std::fs::write(path, repaired)?;
        tracing::info!("Repaired {}: removed {} line(s)", path.display(), removed);
    }
    Ok(removed)
}

/// `<output_dir>/<transcript stem>_segments.json`
pub fn windows_path_for(output_dir: &Path, transcript: &Path) -> PathBuf {
    let stem = transcript
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".into());
    output_dir.join(format!("{stem}_segments.json"))
}

pub fn save_windows(path: &Path, windows: &[HighlightWindow]) -> Result<(), RecorderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(windows)
        .map_err(|e| RecorderError::Other(e.into()))?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_windows(path: &Path) -> Result<Vec<HighlightWindow>, RecorderError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        RecorderError::Other(anyhow::anyhow!("{}: invalid windows file: {e}", path.display()))
    })
}
