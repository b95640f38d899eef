// tests/orchestrator_test.rs — Integration test: orchestrator with mock collaborators

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::sync::oneshot;

use livecap::capture::{ByteStream, CaptureSource, ChatSource, ChatStream};
use livecap::core::types::{ChannelInfo, ChannelRecord, ChatMessage, LiveStatus, Quality};
use livecap::core::{
    LifecycleOrchestrator, OrchestratorSettings, PollReport, Session, SessionContext,
    SessionOutcome, SessionSettings, SessionState,
};
use livecap::infra::errors::RecorderError;
use livecap::jobs::{self, JobHandle, JobTable};
use livecap::media::{MediaTool, ProbeInfo, TranscodeOptions};
use livecap::notify::Notifier;
use livecap::platform::PlatformStatusClient;

// ─── Mocks ──────────────────────────────────────────────────────────────

/// Knows a fixed set of channels; `live` holds the IDs currently online.
struct MockPlatform {
    known: HashMap<String, ChannelInfo>,
    live: Mutex<HashSet<String>>,
    hang: bool,
}

impl MockPlatform {
    fn new(logins: &[&str]) -> Self {
        let known = logins
            .iter()
            .enumerate()
            .map(|(i, login)| {
                (
                    login.to_string(),
                    ChannelInfo {
                        id: format!("id-{i}"),
                        login: login.to_string(),
                        display_name: login.to_uppercase(),
                    },
                )
            })
            .collect();
        Self {
            known,
            live: Mutex::new(HashSet::new()),
            hang: false,
        }
    }

    fn set_live(&self, login: &str, online: bool) {
        let id = self.known[login].id.clone();
        let mut live = self.live.lock().unwrap();
        if online {
            live.insert(id);
        } else {
            live.remove(&id);
        }
    }
}

#[async_trait]
impl PlatformStatusClient for MockPlatform {
    async fn resolve_ids(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, ChannelInfo>, RecorderError> {
        Ok(names
            .iter()
            .filter_map(|n| self.known.get(n).map(|info| (n.clone(), info.clone())))
            .collect())
    }

    async fn live_status(&self, ids: &[String]) -> HashMap<String, LiveStatus> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        let live = self.live.lock().unwrap().clone();
        ids.iter()
            .map(|id| {
                let status = if live.contains(id) {
                    LiveStatus::online("Test stream")
                } else {
                    LiveStatus::offline()
                };
                (id.clone(), status)
            })
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Payload {
    /// A fixed number of bytes, then end of stream.
    Finite(usize),
    /// Keeps producing bytes until the session drops the reader.
    Endless,
    /// A fixed number of bytes, then a connection reset.
    FailAfter(usize),
}

/// Yields its buffer, then fails every read.
struct ResetAfter(std::io::Cursor<Vec<u8>>);

impl AsyncRead for ResetAfter {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if (self.0.position() as usize) < self.0.get_ref().len() {
            return Pin::new(&mut self.0).poll_read(cx, buf);
        }
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        )))
    }
}

/// Hands out quality lists in order (the last one repeats) and records
/// every quality a stream was opened at.
struct MockCapture {
    qualities: Mutex<VecDeque<Vec<String>>>,
    payload: Payload,
    opened: Mutex<Vec<String>>,
}

impl MockCapture {
    fn new(lists: &[&[&str]], payload: Payload) -> Self {
        Self {
            qualities: Mutex::new(
                lists
                    .iter()
                    .map(|l| l.iter().map(|q| q.to_string()).collect())
                    .collect(),
            ),
            payload,
            opened: Mutex::new(Vec::new()),
        }
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureSource for MockCapture {
    async fn available_qualities(&self, _: &ChannelRecord) -> Result<Vec<String>, RecorderError> {
        let mut lists = self.qualities.lock().unwrap();
        let current = lists.front().cloned().unwrap_or_default();
        if lists.len() > 1 {
            lists.pop_front();
        }
        Ok(current)
    }

    async fn open(&self, _: &ChannelRecord, quality: &Quality) -> Result<ByteStream, RecorderError> {
        self.opened.lock().unwrap().push(quality.as_str().to_string());
        match self.payload {
            Payload::Finite(n) => Ok(Box::new(std::io::Cursor::new(vec![7u8; n]))),
            Payload::FailAfter(n) => Ok(Box::new(ResetAfter(std::io::Cursor::new(vec![7u8; n])))),
            Payload::Endless => {
                let (mut writer, reader) = tokio::io::duplex(256);
                tokio::spawn(async move {
                    while writer.write_all(&[1u8; 64]).await.is_ok() {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                });
                Ok(Box::new(reader))
            }
        }
    }
}

struct MockChat;

#[async_trait]
impl ChatSource for MockChat {
    async fn open(&self, _: &ChannelRecord) -> Result<ChatStream, RecorderError> {
        let messages = vec![
            Ok(ChatMessage::new(1_000_000, "hello")),
            Ok(ChatMessage::new(2_000_000, "lol")),
        ];
        Ok(Box::pin(futures::stream::iter(messages)))
    }
}

/// Transcodes by writing a small placeholder file.
struct MockMedia {
    fail_transcode: bool,
}

#[async_trait]
impl MediaTool for MockMedia {
    async fn probe(&self, _: &Path) -> Result<ProbeInfo, RecorderError> {
        Ok(ProbeInfo { duration_secs: 60.0 })
    }

    async fn transcode(&self, _: &Path, output: &Path, _: &TranscodeOptions) -> Result<(), RecorderError> {
        if self.fail_transcode {
            return Err(RecorderError::ToolInvocation {
                tool: "ffmpeg".into(),
                code: Some(1),
                message: "mock failure".into(),
            });
        }
        tokio::fs::write(output, b"mp4").await?;
        Ok(())
    }

    async fn slice(&self, _: &Path, _: &str, _: &str, _: &Path) -> Result<(), RecorderError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str, urgent: bool) {
        self.messages.lock().unwrap().push((message.to_string(), urgent));
    }
}

// ─── Harness ────────────────────────────────────────────────────────────

struct Harness {
    orchestrator: Arc<LifecycleOrchestrator>,
    ctx: SessionContext,
    platform: Arc<MockPlatform>,
    capture: Arc<MockCapture>,
    jobs: JobHandle,
    notifier: Arc<RecordingNotifier>,
    dir: tempfile::TempDir,
}

fn harness(platform: MockPlatform, capture: MockCapture, fail_transcode: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(platform);
    let capture = Arc::new(capture);
    let notifier = Arc::new(RecordingNotifier::default());
    let (jobs, _server) = jobs::spawn_job_server(jobs::in_memory().unwrap());

    let ctx = SessionContext {
        capture: capture.clone(),
        chat: Arc::new(MockChat),
        media: Arc::new(MockMedia { fail_transcode }),
        jobs: Arc::new(jobs.clone()),
        notifier: notifier.clone(),
        settings: SessionSettings {
            chat_flush_timeout: Duration::from_secs(2),
            ..SessionSettings::default()
        },
    };
    let settings = OrchestratorSettings {
        poll_interval: Duration::from_millis(50),
        download_folder: dir.path().join("#streamer#").display().to_string(),
        default_quality: "best".into(),
        max_workers: 8,
        shutdown_grace: Duration::from_secs(5),
        status_timeout: Duration::from_millis(200),
    };
    let orchestrator = LifecycleOrchestrator::new(platform.clone(), ctx.clone(), settings);
    Harness {
        orchestrator,
        ctx,
        platform,
        capture,
        jobs,
        notifier,
        dir,
    }
}

/// Wait until nothing is being captured any more.
async fn wait_idle(orchestrator: &LifecycleOrchestrator) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !orchestrator.snapshot().await.watching.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session did not finish in time");
}

/// Wait until `n` streams have been opened.
async fn wait_opened(capture: &MockCapture, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while capture.opened().len() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stream was not opened in time");
}

// ─── Registration ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_unknown_channel_leaves_watchlist_unchanged() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Finite(0)),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();

    let err = h.orchestrator.register("nobody", "best").await.unwrap_err();
    assert!(matches!(err, RecorderError::UnknownChannel { .. }));
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);
}

#[tokio::test]
async fn test_register_rejects_unknown_quality_and_normalizes_name() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Finite(0)),
        false,
    );
    let err = h.orchestrator.register("foo", "8k").await.unwrap_err();
    assert!(matches!(err, RecorderError::InvalidQuality { .. }));

    h.orchestrator.register("  FOO ", "720p").await.unwrap();
    let snapshot = h.orchestrator.snapshot().await;
    assert_eq!(snapshot.watchlist, vec!["foo"]);
    assert!(snapshot.watching.is_empty());
}

#[tokio::test]
async fn test_unregister_unknown_channel_is_not_found() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Finite(0)),
        false,
    );
    let err = h.orchestrator.unregister("foo").await.unwrap_err();
    assert!(matches!(err, RecorderError::NotFound { .. }));

    h.orchestrator.register("foo", "best").await.unwrap();
    h.orchestrator.unregister("foo").await.unwrap();
    assert!(h.orchestrator.snapshot().await.watchlist.is_empty());
}

#[tokio::test]
async fn test_load_streamers_from_file_skips_blank_and_unknown() {
    let h = harness(
        MockPlatform::new(&["foo", "bar"]),
        MockCapture::new(&[&["best"]], Payload::Finite(0)),
        false,
    );
    let file = h.dir.path().join("streamers.txt");
    std::fs::write(&file, "foo\n\n  bar  \nghost\n").unwrap();

    assert_eq!(h.orchestrator.load_streamers_from_file(&file).await, 2);
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["bar", "foo"]);

    let missing = h.dir.path().join("missing.txt");
    assert_eq!(h.orchestrator.load_streamers_from_file(&missing).await, 0);
}

// ─── Sessions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_finished_stream_is_converted_and_recorded() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["720p", "best"]], Payload::Finite(4096)),
        false,
    );
    h.orchestrator.register("foo", "720p").await.unwrap();
    h.platform.set_live("foo", true);

    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.checked, 1);
    assert_eq!(report.started, vec!["foo"]);

    wait_idle(&h.orchestrator).await;
    assert_eq!(h.capture.opened(), vec!["720p"]);
    // Still registered once the stream ended on its own.
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);

    let pending = h.jobs.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].media_path.ends_with(".mp4"));
    assert!(pending[0].transcript_path.ends_with("_chat.jsonl"));
    assert_eq!(pending[0].channel.as_deref(), Some("foo"));
    assert!(Path::new(&pending[0].media_path).exists());

    // Raw capture removed after a successful transcode.
    let raw = Path::new(&pending[0].media_path).with_extension("ts");
    assert!(!raw.exists());

    let messages = h.notifier.messages.lock().unwrap().clone();
    assert!(messages.iter().any(|(m, _)| m.contains("FOO is live. Saving stream")));
}

#[tokio::test]
async fn test_failed_transcode_keeps_raw_file_in_job() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Finite(2048)),
        true,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;

    let pending = h.jobs.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].media_path.ends_with(".ts"));
    assert!(Path::new(&pending[0].media_path).exists());

    let messages = h.notifier.messages.lock().unwrap().clone();
    assert!(messages
        .iter()
        .any(|(m, urgent)| *urgent && m.contains("Conversion failed")));
}

#[tokio::test]
async fn test_fallback_quality_persists_on_reregistration() {
    // First session: 720p missing, falls back to best. Second session:
    // 720p is offered again but the persisted fallback wins.
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["480p", "best"], &["720p", "best"]], Payload::Finite(1024)),
        false,
    );
    h.orchestrator.register("foo", "720p").await.unwrap();
    h.platform.set_live("foo", true);

    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;
    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;

    assert_eq!(h.capture.opened(), vec!["best", "best"]);
}

#[tokio::test]
async fn test_no_qualities_discards_and_reregisters() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&[]], Payload::Finite(1024)),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;

    assert!(h.capture.opened().is_empty());
    assert!(h.jobs.pending().await.unwrap().is_empty());
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);
}

#[tokio::test]
async fn test_channel_is_never_in_both_sets() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 1).await;

    let snapshot = h.orchestrator.snapshot().await;
    assert_eq!(snapshot.watching, vec!["foo"]);
    assert!(snapshot.watchlist.is_empty());

    // A second round while live starts nothing new.
    let report = h.orchestrator.poll_once().await;
    assert!(report.started.is_empty());

    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_offline_signals_cleanup_and_reregisters() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 1).await;

    h.platform.set_live("foo", false);
    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.went_offline, vec!["foo"]);

    wait_idle(&h.orchestrator).await;
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);
    assert_eq!(h.jobs.pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_during_session_sets_next_quality() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["480p", "best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 1).await;

    let msg = h.orchestrator.register("foo", "480p").await.unwrap();
    assert!(msg.contains("being captured"));
    assert!(h.orchestrator.snapshot().await.watchlist.is_empty());

    h.platform.set_live("foo", false);
    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;

    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 2).await;
    assert_eq!(h.capture.opened(), vec!["best", "480p"]);

    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unregister_during_session_cancels_without_reregistration() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 1).await;

    h.orchestrator.unregister("foo").await.unwrap();
    wait_idle(&h.orchestrator).await;

    let snapshot = h.orchestrator.snapshot().await;
    assert!(snapshot.watching.is_empty());
    assert!(snapshot.watchlist.is_empty());
}

#[tokio::test]
async fn test_register_after_unregister_during_session_reregisters() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["480p", "best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 1).await;

    h.orchestrator.unregister("foo").await.unwrap();
    let msg = h.orchestrator.register("foo", "480p").await.unwrap();
    assert!(msg.contains("being captured"));
    wait_idle(&h.orchestrator).await;

    // The later register wins over the earlier cancel.
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 2).await;
    assert_eq!(h.capture.opened(), vec!["best", "480p"]);

    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unregister_after_register_during_session_drops_channel() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["480p", "best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_opened(&h.capture, 1).await;

    h.orchestrator.register("foo", "480p").await.unwrap();
    h.orchestrator.unregister("foo").await.unwrap();
    wait_idle(&h.orchestrator).await;

    assert!(h.orchestrator.snapshot().await.watchlist.is_empty());
}

#[tokio::test]
async fn test_transport_error_after_data_is_converted() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::FailAfter(3000)),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;

    let pending = h.jobs.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].media_path.ends_with(".mp4"));
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);

    let messages = h.notifier.messages.lock().unwrap().clone();
    assert!(messages
        .iter()
        .any(|(m, urgent)| !*urgent && m.contains("Transport error")));
}

#[tokio::test]
async fn test_unwritable_download_folder_fails_without_job() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Finite(2048)),
        false,
    );
    // A regular file where the channel directory would go.
    let blocker = h.dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    h.orchestrator
        .set_download_folder(&blocker.join("#streamer#").display().to_string())
        .await;

    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);
    h.orchestrator.poll_once().await;
    wait_idle(&h.orchestrator).await;

    assert!(h.capture.opened().is_empty());
    assert!(h.jobs.pending().await.unwrap().is_empty());
    let messages = h.notifier.messages.lock().unwrap().clone();
    assert!(messages
        .iter()
        .any(|(m, urgent)| *urgent && m.contains("Failed to write")));
    assert!(!messages.iter().any(|(m, _)| m.contains("discarded recording")));
    // A disk failure still hands the channel back.
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);
}

// ─── Single session ─────────────────────────────────────────────────────

fn record() -> ChannelRecord {
    ChannelRecord {
        id: "id-0".into(),
        display_name: "FOO".into(),
        login_name: "foo".into(),
        preferred_quality: Quality::best(),
    }
}

/// Run one session to retirement with its chat task alongside.
async fn run_session(ctx: &SessionContext, folder: &str) -> SessionOutcome {
    let session = Session::new(record(), LiveStatus::online("Test stream"), folder, Local::now());
    let (done_tx, done_rx) = oneshot::channel();
    let chat = tokio::spawn(session.chat_task(ctx, done_tx));
    let outcome = session.run(ctx, done_rx).await;
    chat.abort();
    outcome
}

#[tokio::test]
async fn test_session_outcome_after_mid_stream_reset() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::FailAfter(3000)),
        false,
    );
    let folder = h.dir.path().join("#streamer#").display().to_string();
    let outcome = run_session(&h.ctx, &folder).await;

    assert_eq!(outcome.ended_as, SessionState::Ended);
    assert!(!outcome.cancelled);
    assert!(matches!(outcome.error, Some(RecorderError::Transport { .. })));
    let recording = outcome.recording.unwrap();
    assert_eq!(recording.extension().and_then(|e| e.to_str()), Some("mp4"));
    assert_eq!(std::fs::read(&recording).unwrap(), b"mp4");

    let job = h.jobs.get(outcome.job_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(job.media_path, recording.display().to_string());
}

#[tokio::test]
async fn test_session_outcome_after_disk_failure() {
    let h = harness(
        MockPlatform::new(&["foo"]),
        MockCapture::new(&[&["best"]], Payload::Finite(2048)),
        false,
    );
    let blocker = h.dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let folder = blocker.join("#streamer#").display().to_string();
    let outcome = run_session(&h.ctx, &folder).await;

    assert_eq!(outcome.ended_as, SessionState::Failed);
    assert!(matches!(outcome.error, Some(RecorderError::Write { .. })));
    assert!(outcome.recording.is_none());
    assert!(outcome.job_id.is_none());
    assert!(h.jobs.pending().await.unwrap().is_empty());
}

// ─── Polling + shutdown ─────────────────────────────────────────────────

#[tokio::test]
async fn test_hung_status_call_fails_round_without_changes() {
    let mut platform = MockPlatform::new(&["foo"]);
    platform.hang = true;
    let h = harness(
        platform,
        MockCapture::new(&[&["best"]], Payload::Finite(1024)),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.platform.set_live("foo", true);

    let report = h.orchestrator.poll_once().await;
    assert!(report.failed);
    assert!(report.started.is_empty());
    assert_eq!(h.orchestrator.snapshot().await.watchlist, vec!["foo"]);
}

#[tokio::test]
async fn test_shutdown_drains_and_stops_rearming() {
    let h = harness(
        MockPlatform::new(&["foo", "bar"]),
        MockCapture::new(&[&["best"]], Payload::Endless),
        false,
    );
    h.orchestrator.register("foo", "best").await.unwrap();
    h.orchestrator.register("bar", "best").await.unwrap();
    h.platform.set_live("foo", true);

    let run = tokio::spawn(h.orchestrator.clone().run());
    wait_opened(&h.capture, 1).await;

    h.orchestrator.shutdown().await;
    tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("poll loop did not stop")
        .unwrap();

    let snapshot = h.orchestrator.snapshot().await;
    assert!(snapshot.watching.is_empty());
    // Cancelled sessions are not re-registered; idle entries stay put.
    assert_eq!(snapshot.watchlist, vec!["bar"]);
    assert!(h.orchestrator.is_stopping());

    // Nothing starts once stopping.
    h.platform.set_live("bar", true);
    assert_eq!(h.orchestrator.poll_once().await, PollReport::default());

    // Idempotent.
    h.orchestrator.shutdown().await;
}
