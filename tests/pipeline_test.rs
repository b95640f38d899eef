// tests/pipeline_test.rs — Integration test: transcript → highlight windows → clips

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use livecap::clips::{ClipExtractor, ClipSettings};
use livecap::core::types::ChatMessage;
use livecap::highlights::{self, DetectorConfig, HighlightWindow};
use livecap::infra::config::HighlightsConfig;
use livecap::infra::errors::RecorderError;
use livecap::jobs::{self, JobOutcome, JobTable};
use livecap::media::{MediaTool, ProbeInfo, TranscodeOptions};
use livecap::notify::Notifier;
use livecap::pipeline::{self, BatchSummary, PipelineContext};

const SEC: i64 = 1_000_000;
const T0: i64 = 1_714_564_800 * SEC;

/// Records every slice and writes a placeholder clip. `fail_call` makes
/// the n-th slice (0-based) fail.
struct MockMedia {
    duration_secs: f64,
    fail_call: Option<usize>,
    slices: Mutex<Vec<(String, String)>>,
}

impl MockMedia {
    fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            fail_call: None,
            slices: Mutex::new(Vec::new()),
        }
    }

    fn slices(&self) -> Vec<(String, String)> {
        self.slices.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTool for MockMedia {
    async fn probe(&self, _: &Path) -> Result<ProbeInfo, RecorderError> {
        Ok(ProbeInfo {
            duration_secs: self.duration_secs,
        })
    }

    async fn transcode(&self, _: &Path, _: &Path, _: &TranscodeOptions) -> Result<(), RecorderError> {
        Ok(())
    }

    async fn slice(&self, _: &Path, start: &str, end: &str, output: &Path) -> Result<(), RecorderError> {
        let call = {
            let mut slices = self.slices.lock().unwrap();
            slices.push((start.to_string(), end.to_string()));
            slices.len() - 1
        };
        if self.fail_call == Some(call) {
            return Err(RecorderError::ToolInvocation {
                tool: "ffmpeg".into(),
                code: Some(1),
                message: "mock slice failure".into(),
            });
        }
        tokio::fs::write(output, b"clip").await?;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, bool)>>,
}

impl RecordingNotifier {
    fn urgent(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, urgent)| *urgent)
            .map(|(m, _)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str, urgent: bool) {
        self.messages.lock().unwrap().push((message.to_string(), urgent));
    }
}

fn write_transcript(path: &Path, messages: &[ChatMessage]) {
    let mut f = std::fs::File::create(path).unwrap();
    for m in messages {
        writeln!(f, "{}", serde_json::to_string(m).unwrap()).unwrap();
    }
}

/// One quiet message at 0s, a 20-message laugh burst at 100..105s, and a
/// goodbye at 300s.
fn bursty_chat() -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(T0, "hello")];
    for i in 0..20 {
        messages.push(ChatMessage::new(T0 + 100 * SEC + i * 250_000, "LOL"));
    }
    messages.push(ChatMessage::new(T0 + 300 * SEC, "bye"));
    messages
}

fn quiet_chat() -> Vec<ChatMessage> {
    (0..5)
        .map(|i| ChatMessage::new(T0 + i * 30 * SEC, "hello there"))
        .collect()
}

/// A recording + transcript pair named the way sessions name them.
fn recording(dir: &Path, chat: &[ChatMessage]) -> (PathBuf, PathBuf) {
    let video = dir.join("2024-05-01 12.00.00 - Foo - Big match.mp4");
    std::fs::write(&video, vec![0u8; 4096]).unwrap();
    let transcript = dir.join("2024-05-01 12.00.00 - Foo - Big match_chat.jsonl");
    write_transcript(&transcript, chat);
    (video, transcript)
}

fn detector() -> DetectorConfig {
    DetectorConfig::from_config(&HighlightsConfig::default()).unwrap()
}

struct Pipeline {
    ctx: PipelineContext,
    media: Arc<MockMedia>,
    notifier: Arc<RecordingNotifier>,
    jobs: Arc<dyn JobTable>,
}

fn batch_pipeline(dir: &Path, clips: ClipSettings) -> Pipeline {
    let (handle, _server) = jobs::spawn_job_server(jobs::in_memory().unwrap());
    let jobs: Arc<dyn JobTable> = Arc::new(handle);
    let media = Arc::new(MockMedia::new(600.0));
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = PipelineContext {
        jobs: jobs.clone(),
        media: media.clone(),
        notifier: notifier.clone(),
        detector: detector(),
        clips,
        windows_dir: dir.join("segments"),
    };
    Pipeline {
        ctx,
        media,
        notifier,
        jobs,
    }
}

// ─── Detector over a real transcript file ───────────────────────────────

#[test]
fn test_burst_in_transcript_becomes_one_window() {
    let dir = tempfile::tempdir().unwrap();
    let (_, transcript) = recording(dir.path(), &bursty_chat());

    let messages = highlights::load_transcript(&transcript).unwrap();
    let windows = highlights::detect(&messages, &detector());
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start, 100 * SEC);
    // Bounds are the first and last message of the burst.
    assert_eq!(windows[0].end, 100 * SEC + 19 * 250_000);
    assert_eq!(windows[0].messages.len(), 20);
    // Messages keep their absolute timestamps.
    assert_eq!(windows[0].messages[0].timestamp, T0 + 100 * SEC);
}

#[test]
fn test_truncated_transcript_is_repaired_before_detection() {
    let dir = tempfile::tempdir().unwrap();
    let (_, transcript) = recording(dir.path(), &bursty_chat());
    let mut f = std::fs::OpenOptions::new().append(true).open(&transcript).unwrap();
    write!(f, "{{\"timestamp\": 17145").unwrap();
    drop(f);

    assert_eq!(highlights::repair_transcript(&transcript).unwrap(), 1);
    assert_eq!(highlights::load_transcript(&transcript).unwrap().len(), 22);
}

// ─── Extractor ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_pads_and_names_clips() {
    let dir = tempfile::tempdir().unwrap();
    let (video, _) = recording(dir.path(), &bursty_chat());
    let media = Arc::new(MockMedia::new(600.0));
    let settings = ClipSettings {
        save_chat_messages: true,
        ..ClipSettings::default()
    };
    let extractor = ClipExtractor::new(media.clone(), Arc::new(RecordingNotifier::default()), settings);

    let window = HighlightWindow {
        start: 100 * SEC,
        end: 110 * SEC,
        messages: vec![ChatMessage::new(T0 + 100 * SEC, "LOL")],
    };
    let report = extractor.extract(&video, &[window]).await.unwrap();

    assert_eq!(media.slices(), vec![("00:01:00".to_string(), "00:02:30".to_string())]);
    assert_eq!(report.clips.len(), 1);
    let expected_dir = dir.path().join("Clips").join("Foo").join("2024-05-01");
    assert_eq!(report.clips[0].output_path, expected_dir.join("clip_001_000100.mp4"));
    assert!(expected_dir.join("clip_001_000100_chat.json").exists());
    assert!(!report.original_deleted);
    assert!(video.exists());
}

#[tokio::test]
async fn test_extract_clamps_to_video_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let (video, _) = recording(dir.path(), &[]);
    let media = Arc::new(MockMedia::new(120.0));
    let extractor = ClipExtractor::new(
        media.clone(),
        Arc::new(RecordingNotifier::default()),
        ClipSettings::default(),
    );

    let windows = vec![
        HighlightWindow {
            start: 5 * SEC,
            end: 10 * SEC,
            messages: vec![],
        },
        HighlightWindow {
            start: 110 * SEC,
            end: 118 * SEC,
            messages: vec![],
        },
    ];
    extractor.extract(&video, &windows).await.unwrap();

    // 5..10 pads to -37.5..52.5 → 0..52; 110..118 pads to 69..159 → 69..120.
    assert_eq!(
        media.slices(),
        vec![
            ("00:00:00".to_string(), "00:00:52".to_string()),
            ("00:01:09".to_string(), "00:02:00".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failed_slice_keeps_original() {
    let dir = tempfile::tempdir().unwrap();
    let (video, _) = recording(dir.path(), &[]);
    let mut media = MockMedia::new(600.0);
    media.fail_call = Some(0);
    let media = Arc::new(media);
    let notifier = Arc::new(RecordingNotifier::default());
    let settings = ClipSettings {
        delete_original_on_success: true,
        ..ClipSettings::default()
    };
    let extractor = ClipExtractor::new(media.clone(), notifier.clone(), settings);

    let windows = vec![
        HighlightWindow {
            start: 100 * SEC,
            end: 110 * SEC,
            messages: vec![],
        },
        HighlightWindow {
            start: 400 * SEC,
            end: 410 * SEC,
            messages: vec![],
        },
    ];
    let report = extractor.extract(&video, &windows).await.unwrap();

    // The batch continues past the failure.
    assert_eq!(media.slices().len(), 2);
    assert_eq!(report.clips.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].window, 0);
    assert!(!report.original_deleted);
    assert!(video.exists());
    assert!(notifier.urgent().iter().any(|m| m.contains("Error slicing video")));
}

#[tokio::test]
async fn test_successful_batch_deletes_original_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let (video, _) = recording(dir.path(), &[]);
    let settings = ClipSettings {
        delete_original_on_success: true,
        ..ClipSettings::default()
    };
    let extractor = ClipExtractor::new(
        Arc::new(MockMedia::new(600.0)),
        Arc::new(RecordingNotifier::default()),
        settings,
    );
    let window = HighlightWindow {
        start: 100 * SEC,
        end: 110 * SEC,
        messages: vec![],
    };
    let report = extractor.extract(&video, &[window]).await.unwrap();
    assert!(report.original_deleted);
    assert!(!video.exists());
}

// ─── Batch pipeline ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_process_pending_marks_job_processed() {
    let dir = tempfile::tempdir().unwrap();
    let (video, transcript) = recording(dir.path(), &bursty_chat());
    let p = batch_pipeline(dir.path(), ClipSettings::default());
    let id = p
        .jobs
        .insert(
            &video.display().to_string(),
            &transcript.display().to_string(),
            Some("foo"),
        )
        .await
        .unwrap();

    let summary = pipeline::process_pending(&p.ctx).await.unwrap();
    assert_eq!(
        summary,
        BatchSummary {
            processed: 1,
            failed: 0,
            skipped: 0
        }
    );
    assert_eq!(p.jobs.get(id).await.unwrap().unwrap().outcome, JobOutcome::Processed);
    assert_eq!(p.media.slices().len(), 1);

    let windows_file = highlights::windows_path_for(&p.ctx.windows_dir, &transcript);
    assert_eq!(highlights::load_windows(&windows_file).unwrap().len(), 1);

    // Nothing left to do on a second run.
    let summary = pipeline::process_pending(&p.ctx).await.unwrap();
    assert_eq!(summary, BatchSummary::default());
}

#[tokio::test]
async fn test_process_pending_fails_job_with_missing_video() {
    let dir = tempfile::tempdir().unwrap();
    let (video, transcript) = recording(dir.path(), &bursty_chat());
    std::fs::remove_file(&video).unwrap();
    let p = batch_pipeline(dir.path(), ClipSettings::default());
    let id = p
        .jobs
        .insert(&video.display().to_string(), &transcript.display().to_string(), None)
        .await
        .unwrap();

    let summary = pipeline::process_pending(&p.ctx).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(p.jobs.get(id).await.unwrap().unwrap().outcome, JobOutcome::Failed);
    assert!(p.media.slices().is_empty());
    assert!(p.notifier.urgent().iter().any(|m| m.contains("Video file")));
}

#[tokio::test]
async fn test_no_highlights_discards_recording_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let (video, transcript) = recording(dir.path(), &quiet_chat());
    let settings = ClipSettings {
        delete_if_no_highlights: true,
        ..ClipSettings::default()
    };
    let p = batch_pipeline(dir.path(), settings);
    let id = p
        .jobs
        .insert(&video.display().to_string(), &transcript.display().to_string(), None)
        .await
        .unwrap();

    let summary = pipeline::process_pending(&p.ctx).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert!(!video.exists());
    assert!(p.jobs.get(id).await.unwrap().is_none());
    assert!(p.notifier.urgent().iter().any(|m| m.contains("No interesting segments")));
}

#[tokio::test]
async fn test_no_highlights_keeps_recording_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let (video, transcript) = recording(dir.path(), &quiet_chat());
    let p = batch_pipeline(dir.path(), ClipSettings::default());
    let id = p
        .jobs
        .insert(&video.display().to_string(), &transcript.display().to_string(), None)
        .await
        .unwrap();

    let summary = pipeline::process_pending(&p.ctx).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert!(video.exists());
    assert_eq!(p.jobs.get(id).await.unwrap().unwrap().outcome, JobOutcome::Processed);
}
