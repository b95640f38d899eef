// src/infra/daemon/mod.rs

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::api;
use crate::capture::chat::CommandChatSource;
use crate::capture::streamlink::StreamlinkSource;
use crate::cli::shell;
use crate::core::{LifecycleOrchestrator, OrchestratorSettings, SessionContext, SessionSettings};
use crate::infra::config::Config;
use crate::infra::paths;
use crate::jobs;
use crate::media::ffmpeg::Ffmpeg;
use crate::notify;
use crate::platform::twitch::TwitchClient;

pub mod process;

pub use process::{is_daemon_running, read_pid, remove_pid_file, stop_daemon, write_pid_file};

/// Wire up the real collaborators and hand back the orchestrator.
pub fn build_orchestrator(config: &Config) -> anyhow::Result<Arc<LifecycleOrchestrator>> {
    let ffmpeg = Ffmpeg::new(&config.media);
    if !ffmpeg.available() {
        tracing::warn!("ffmpeg/ffprobe not found; recordings will not be converted");
    }
    if which::which(&config.capture.streamlink_path).is_err() {
        tracing::warn!(
            "'{}' not found on PATH; captures will fail",
            config.capture.streamlink_path
        );
    }

    let store = jobs::open(&paths::db_path())?;
    let (job_handle, _job_server) = jobs::spawn_job_server(store);

    let ctx = SessionContext {
        capture: Arc::new(StreamlinkSource::new(&config.capture)),
        chat: Arc::new(CommandChatSource::new(&config.capture)),
        media: Arc::new(ffmpeg),
        jobs: Arc::new(job_handle),
        notifier: notify::from_config(&config.notify),
        settings: SessionSettings::from_config(config),
    };
    Ok(LifecycleOrchestrator::new(
        Arc::new(TwitchClient::new(&config.platform)),
        ctx,
        OrchestratorSettings::from_config(&config.daemon),
    ))
}

/// Run the daemon until Ctrl+C, SIGTERM, `POST /api/v1/shutdown`, or the
/// shell's `exit`.
pub async fn run_daemon(config: &Config, with_shell: bool) -> anyhow::Result<()> {
    tracing::info!("livecap daemon starting...");
    paths::ensure_dirs()?;

    let orchestrator = build_orchestrator(config)?;
    if let Some(ref file) = config.daemon.streamers_file {
        let added = orchestrator.load_streamers_from_file(Path::new(file)).await;
        tracing::info!("Loaded {} channel(s) from {}", added, file);
    }

    let poll_loop = tokio::spawn(orchestrator.clone().run());
    let shutdown = Arc::new(Notify::new());

    // ── HTTP API ────────────────────────────────────────────────────
    let server_stop = Arc::new(Notify::new());
    let api_config = config.api.clone().unwrap_or_default();
    let api_task = if api_config.enabled {
        let state = api::ApiState {
            orchestrator: orchestrator.clone(),
            token: api_config.token.clone(),
            default_quality: config.daemon.default_quality.clone(),
            shutdown: shutdown.clone(),
        };
        let stop = server_stop.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::start_server(&api_config, state, stop).await {
                tracing::error!("API server failed: {}", e);
            }
        }))
    } else {
        None
    };

    if with_shell {
        let orchestrator = orchestrator.clone();
        let quality = config.daemon.default_quality.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shell::run_shell(orchestrator, quality, shutdown).await {
                tracing::error!("Shell failed: {}", e);
            }
        });
    } else {
        println!("Daemon running. Press Ctrl+C to stop.");
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupt received"),
        _ = terminate() => tracing::info!("Terminate signal received"),
        _ = shutdown.notified() => tracing::info!("Shutdown requested"),
    }

    orchestrator.shutdown().await;
    if let Err(e) = poll_loop.await {
        tracing::warn!("Poll loop ended abnormally: {}", e);
    }
    server_stop.notify_one();
    if let Some(task) = api_task {
        let _ = task.await;
    }
    tracing::info!("Daemon stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
