// src/notify/telegram.rs — Telegram sink (Bot API sendMessage)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::Notifier;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            chat_id,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.bot_token)
    }

    fn payload(&self, message: &str, urgent: bool) -> serde_json::Value {
        serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
            "disable_notification": !urgent,
        })
    }

    async fn send(&self, message: &str, urgent: bool) -> anyhow::Result<()> {
        let resp: TelegramResponse = self
            .client
            .post(self.api_url("sendMessage"))
            .timeout(Duration::from_secs(10))
            .json(&self.payload(message, urgent))
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            anyhow::bail!(
                "Telegram sendMessage failed: {}",
                resp.description.unwrap_or_default()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str, urgent: bool) {
        tracing::debug!("[notify] {}", message);
        if let Err(e) = self.send(message, urgent).await {
            tracing::warn!("Telegram notification dropped: {}", e);
        }
    }
}
