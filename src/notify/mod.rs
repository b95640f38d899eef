// src/notify/mod.rs — Best-effort operator notifications

pub mod telegram;

use async_trait::async_trait;
use std::sync::Arc;

use crate::infra::config::NotifyConfig;

/// Fire-and-forget notification sink. Implementations swallow and log their
/// own delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str, urgent: bool);
}

/// Writes notifications to the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str, urgent: bool) {
        if urgent {
            tracing::warn!("[notify] {}", message);
        } else {
            tracing::info!("[notify] {}", message);
        }
    }
}

/// Build the configured sink, falling back to the log.
pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match config.telegram {
        Some(ref tg) => {
            tracing::info!("Notifications: Telegram chat {}", tg.chat_id);
            Arc::new(telegram::TelegramNotifier::new(
                tg.bot_token.clone(),
                tg.chat_id.clone(),
            ))
        }
        None => Arc::new(LogNotifier),
    }
}
