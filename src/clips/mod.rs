// src/clips/mod.rs — Clip extraction from finished recordings

pub mod extractor;

pub use extractor::{
    clamp, clip_dir_for, pad, plan_span, Clip, ClipExtractor, ClipFailure, ClipSettings,
    ExtractionReport,
};
