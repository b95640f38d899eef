// src/capture/mod.rs — Stream + chat capture loops and their collaborator traits

pub mod chat;
pub mod streamlink;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::core::flags::SessionFlags;
use crate::core::types::{ChannelRecord, ChatMessage, Quality};
use crate::infra::errors::RecorderError;

/// Bytes read per iteration of the capture loop.
pub const CHUNK_SIZE: usize = 1024;

pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatMessage, RecorderError>> + Send>>;

/// The stream-capture tool, seen as "list qualities" plus "give me bytes".
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Qualities currently offered for the channel, in the order the tool lists them.
    async fn available_qualities(
        &self,
        channel: &ChannelRecord,
    ) -> Result<Vec<String>, RecorderError>;

    async fn open(
        &self,
        channel: &ChannelRecord,
        quality: &Quality,
    ) -> Result<ByteStream, RecorderError>;
}

/// The chat-fetching tool. The stream is finite once the broadcast ends.
#[async_trait]
pub trait ChatSource: Send + Sync {
    async fn open(&self, channel: &ChannelRecord) -> Result<ChatStream, RecorderError>;
}

/// Why a capture loop returned.
#[derive(Debug)]
pub enum CaptureEnd {
    /// Zero-length read.
    EndOfStream,
    /// A flag was observed before the next read.
    Stopped,
    Failed(RecorderError),
}

#[derive(Debug)]
pub struct CaptureReport {
    pub bytes_written: u64,
    pub end: CaptureEnd,
}

impl CaptureReport {
    pub fn failed(err: RecorderError) -> Self {
        Self {
            bytes_written: 0,
            end: CaptureEnd::Failed(err),
        }
    }

    pub fn stopped() -> Self {
        Self {
            bytes_written: 0,
            end: CaptureEnd::Stopped,
        }
    }

    pub fn error(&self) -> Option<&RecorderError> {
        match &self.end {
            CaptureEnd::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Append `stream` to `path` in [`CHUNK_SIZE`] chunks until it ends, fails,
/// or either session flag is set. A zero-length read requests cleanup.
pub async fn run_capture(
    login: &str,
    mut stream: ByteStream,
    path: &Path,
    flags: &SessionFlags,
) -> CaptureReport {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
    {
        Ok(f) => f,
        Err(e) => return CaptureReport::failed(RecorderError::write(path, e)),
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut bytes_written = 0u64;

    let mut end = loop {
        if flags.should_stop() {
            break CaptureEnd::Stopped;
        }
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => break CaptureEnd::Failed(RecorderError::transport(login, e)),
        };
        if n == 0 {
            flags.request_cleanup();
            break CaptureEnd::EndOfStream;
        }
        if let Err(e) = file.write_all(&buf[..n]).await {
            break CaptureEnd::Failed(RecorderError::write(path, e));
        }
        bytes_written += n as u64;
    };

    if let Err(e) = file.flush().await {
        if !matches!(end, CaptureEnd::Failed(_)) {
            end = CaptureEnd::Failed(RecorderError::write(path, e));
        }
    }

    tracing::debug!("[{}] capture loop exited after {} bytes", login, bytes_written);
    CaptureReport { bytes_written, end }
}

#[derive(Debug, Default)]
pub struct ChatReport {
    pub messages: usize,
    pub error: Option<RecorderError>,
}

/// Write chat records to `path` as JSON lines until the source ends or
/// either flag is set. Every record is flushed before the next one is read.
pub async fn run_chat_capture(
    source: &dyn ChatSource,
    channel: &ChannelRecord,
    path: &Path,
    flags: &SessionFlags,
) -> ChatReport {
    let mut report = ChatReport::default();
    if flags.should_stop() {
        return report;
    }

    let mut stream = tokio::select! {
        opened = source.open(channel) => match opened {
            Ok(s) => s,
            Err(e) => {
                report.error = Some(e);
                return report;
            }
        },
        _ = flags.stopped() => return report,
    };

    if let Some(dir) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            report.error = Some(RecorderError::write(dir, e));
            return report;
        }
    }
    let mut file = match tokio::fs::File::create(path).await {
        Ok(f) => f,
        Err(e) => {
            report.error = Some(RecorderError::write(path, e));
            return report;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = flags.stopped() => break,
            next = stream.next() => next,
        };
        let message = match next {
            None => break,
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                tracing::warn!("[{}] chat source failed: {}", channel.login_name, e);
                report.error = Some(e);
                break;
            }
        };
        if flags.should_stop() {
            break;
        }

        let mut line = match serde_json::to_vec(&message) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!("[{}] skipping unencodable chat record: {}", channel.login_name, e);
                continue;
            }
        };
        line.push(b'\n');
        let written = async {
            file.write_all(&line).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            report.error = Some(RecorderError::write(path, e));
            break;
        }
        report.messages += 1;
    }

    if let Err(e) = file.sync_all().await {
        tracing::debug!("[{}] transcript sync failed: {}", channel.login_name, e);
    }
    report
}
