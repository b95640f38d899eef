// src/highlights/detector.rs — Chat-activity highlight detection

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::types::ChatMessage;
use crate::infra::config::HighlightsConfig;
use crate::infra::errors::RecorderError;

const MICROS_PER_SEC: i64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub segment_length_secs: u64,
    pub frequency_threshold: usize,
    /// Lowercased.
    pub keywords: Vec<String>,
    pub laughter: Regex,
}

impl DetectorConfig {
    pub fn new<S: AsRef<str>>(
        segment_length_secs: u64,
        frequency_threshold: usize,
        keywords: &[S],
        laughter_pattern: &str,
    ) -> Result<Self, RecorderError> {
        if segment_length_secs == 0 {
            return Err(RecorderError::Config(
                "segment length must be at least one second".into(),
            ));
        }
        let laughter = Regex::new(&format!("(?i){laughter_pattern}")).map_err(|e| {
            RecorderError::Config(format!("invalid laughter pattern '{laughter_pattern}': {e}"))
        })?;
        Ok(Self {
            segment_length_secs,
            frequency_threshold,
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            laughter,
        })
    }

    pub fn from_config(config: &HighlightsConfig) -> Result<Self, RecorderError> {
        Self::new(
            config.segment_length_secs,
            config.frequency_threshold,
            config.keywords.as_slice(),
            &config.laughter_pattern,
        )
    }

    fn segment_micros(&self) -> i64 {
        self.segment_length_secs as i64 * MICROS_PER_SEC
    }

    /// Keyword hit first, laughter pattern as the fallback.
    pub fn matches(&self, message: &ChatMessage) -> bool {
        let text = message.message.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str())) || self.laughter.is_match(&text)
    }
}

/// One fixed-width bucket of the transcript. Bounds are microseconds
/// relative to the first message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSegment {
    pub start: i64,
    pub end: i64,
    pub messages: Vec<ChatMessage>,
}

/// A merged run of interesting segments, as persisted:
/// `start`/`end` are microseconds relative to the transcript's first message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightWindow {
    pub start: i64,
    pub end: i64,
    pub messages: Vec<ChatMessage>,
}

impl HighlightWindow {
    pub fn duration_micros(&self) -> i64 {
        self.end - self.start
    }
}

/// Split the transcript into consecutive `segment_length` buckets anchored
/// at the first message. Silent stretches produce empty buckets; the final
/// bucket is closed on the right and may be shorter than the rest.
pub fn segment(messages: &[ChatMessage], config: &DetectorConfig) -> Vec<ChatSegment> {
    let Some(first) = messages.first() else {
        return Vec::new();
    };
    let length = config.segment_micros();
    let origin = first.timestamp;
    let total = messages
        .iter()
        .map(|m| (m.timestamp - origin).max(0))
        .max()
        .unwrap_or(0);
    let count = ((total + length - 1) / length).max(1) as usize;

    let mut segments: Vec<ChatSegment> = (0..count)
        .map(|k| {
            let start = k as i64 * length;
            let end = if k + 1 == count { total.max(start) } else { start + length };
            ChatSegment {
                start,
                end,
                messages: Vec::new(),
            }
        })
        .collect();

    // Never step backwards, so concatenating segments keeps arrival order.
    let mut current = 0usize;
    for message in messages {
        let offset = (message.timestamp - origin).max(0);
        let bucket = ((offset / length) as usize).min(count - 1);
        current = current.max(bucket);
        segments[current].messages.push(message.clone());
    }
    segments
}

/// Number of messages in the segment that hit a keyword or the laughter pattern.
pub fn score(segment: &ChatSegment, config: &DetectorConfig) -> usize {
    segment.messages.iter().filter(|m| config.matches(m)).count()
}

pub fn is_interesting(segment: &ChatSegment, config: &DetectorConfig) -> bool {
    !segment.messages.is_empty() && score(segment, config) >= config.frequency_threshold
}

/// Fold time-ordered windows together whenever the gap between one's last
/// message and the next one's first message is at most `segment_length`.
pub fn merge_windows(windows: Vec<HighlightWindow>, segment_length_secs: u64) -> Vec<HighlightWindow> {
    let max_gap = segment_length_secs as i64 * MICROS_PER_SEC;
    let mut merged: Vec<HighlightWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(running) if window.start - running.end <= max_gap => {
                running.end = running.end.max(window.end);
                running.messages.extend(window.messages);
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Full pipeline: segment, keep interesting segments, merge.
pub fn detect(messages: &[ChatMessage], config: &DetectorConfig) -> Vec<HighlightWindow> {
    let Some(first) = messages.first() else {
        return Vec::new();
    };
    let origin = first.timestamp;

    let windows = segment(messages, config)
        .into_iter()
        .filter(|s| is_interesting(s, config))
        .filter_map(|s| {
            let start = s.messages.first()?.timestamp - origin;
            let end = s.messages.last()?.timestamp - origin;
            Some(HighlightWindow {
                start: start.max(0),
                end: end.max(start.max(0)),
                messages: s.messages,
            })
        })
        .collect();

    merge_windows(windows, config.segment_length_secs)
}
