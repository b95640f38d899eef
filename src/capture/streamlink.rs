// src/capture/streamlink.rs — CaptureSource backed by the streamlink CLI

use async_trait::async_trait;
use serde::Deserialize;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};

use super::{ByteStream, CaptureSource};
use crate::core::types::{ChannelRecord, Quality};
use crate::infra::config::CaptureConfig;
use crate::infra::errors::RecorderError;
use crate::util::truncate_str;

pub struct StreamlinkSource {
    binary: String,
    url_template: String,
}

impl StreamlinkSource {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            binary: config.streamlink_path.clone(),
            url_template: config.url_template.clone(),
        }
    }

    pub fn channel_url(&self, channel: &ChannelRecord) -> String {
        self.url_template.replace("{login}", &channel.login_name)
    }
}

#[derive(Deserialize)]
struct StreamsDocument {
    #[serde(default)]
    streams: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Quality labels from `streamlink --json` output, in listed order.
/// An error document (channel offline) yields no qualities.
fn parse_qualities(stdout: &str) -> Result<Vec<String>, serde_json::Error> {
    let doc: StreamsDocument = serde_json::from_str(stdout)?;
    if let Some(err) = doc.error {
        tracing::debug!("streamlink reported: {}", err);
        return Ok(Vec::new());
    }
    Ok(doc.streams.keys().cloned().collect())
}

/// Keeps the child process alive for as long as its stdout is being read.
struct ChildReader {
    _child: Child,
    stdout: ChildStdout,
}

impl AsyncRead for ChildReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

#[async_trait]
impl CaptureSource for StreamlinkSource {
    async fn available_qualities(
        &self,
        channel: &ChannelRecord,
    ) -> Result<Vec<String>, RecorderError> {
        let url = self.channel_url(channel);
        let output = Command::new(&self.binary)
            .args(["--json", &url])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RecorderError::ToolInvocation {
                tool: self.binary.clone(),
                code: None,
                message: e.to_string(),
            })?;

        // streamlink exits non-zero for offline channels but still prints JSON.
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_qualities(&stdout).map_err(|e| RecorderError::ToolInvocation {
            tool: self.binary.clone(),
            code: output.status.code(),
            message: format!("{e}: {}", truncate_str(stdout.trim(), 200)),
        })
    }

    async fn open(
        &self,
        channel: &ChannelRecord,
        quality: &Quality,
    ) -> Result<ByteStream, RecorderError> {
        let url = self.channel_url(channel);
        let mut child = Command::new(&self.binary)
            .args([url.as_str(), quality.as_str(), "--stdout", "--loglevel", "error"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::transport(&channel.login_name, e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            RecorderError::transport(&channel.login_name, "capture tool has no stdout")
        })?;

        tracing::debug!(
            "[{}] streamlink started for {} at {}",
            channel.login_name,
            url,
            quality
        );
        Ok(Box::new(ChildReader {
            _child: child,
            stdout,
        }))
    }
}
