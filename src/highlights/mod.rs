// src/highlights/mod.rs — Post-hoc chat highlight detection

pub mod detector;
pub mod transcript;

pub use detector::{
    detect, merge_windows, score, segment, ChatSegment, DetectorConfig, HighlightWindow,
};
pub use transcript::{
    load_transcript, load_windows, repair_transcript, save_windows, windows_path_for,
};
