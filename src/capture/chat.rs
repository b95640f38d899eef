// src/capture/chat.rs — ChatSource that reads JSON lines from an external chat tool

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{ChatSource, ChatStream};
use crate::core::types::{ChannelRecord, ChatMessage};
use crate::infra::config::CaptureConfig;
use crate::infra::errors::RecorderError;

pub struct CommandChatSource {
    argv: Vec<String>,
    url_template: String,
}

impl CommandChatSource {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            argv: config.chat_command.clone(),
            url_template: config.url_template.clone(),
        }
    }

    fn command_line(&self, channel: &ChannelRecord) -> Vec<String> {
        let url = self.url_template.replace("{login}", &channel.login_name);
        self.argv.iter().map(|a| a.replace("{url}", &url)).collect()
    }
}

/// Reduce a tool record to the persisted `{timestamp, message, message_type}` shape.
pub fn normalize(record: &Value) -> Option<ChatMessage> {
    let timestamp = record
        .get("timestamp")
        .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))?;
    Some(ChatMessage {
        timestamp,
        message: record
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        message_type: record
            .get("message_type")
            .and_then(Value::as_str)
            .unwrap_or("text_message")
            .to_string(),
    })
}

#[async_trait]
impl ChatSource for CommandChatSource {
    async fn open(&self, channel: &ChannelRecord) -> Result<ChatStream, RecorderError> {
        let argv = self.command_line(channel);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RecorderError::Config("capture.chat_command is empty".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::ToolInvocation {
                tool: program.clone(),
                code: None,
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            RecorderError::transport(&channel.login_name, "chat tool has no stdout")
        })?;
        let login = channel.login_name.clone();

        let stream = async_stream::stream! {
            // Owned by the stream so dropping it kills the tool.
            let _child = child;
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Value>(line).ok().as_ref().and_then(normalize) {
                            Some(message) => yield Ok(message),
                            None => tracing::debug!("[{}] ignoring chat line: {}", login, line),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(RecorderError::transport(&login, e));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
