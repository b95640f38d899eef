// src/platform/retry.rs — Retry with exponential backoff for platform calls
//
// Retries: server errors (5xx), timeouts, connection resets.
// Does NOT retry: bad request (400), auth errors (401, 403), not found.

use std::future::Future;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const INITIAL_DELAY_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 20_000;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn from_platform(config: &crate::infra::config::PlatformConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            ..Self::default()
        }
    }

    /// Delay before retry `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms.max(0.0) as u64)
    }
}

/// Outcome of one attempt, as judged by the caller.
pub enum Attempt<T, E> {
    Done(T),
    Retry(E),
    Fail(E),
}

/// Whether an HTTP status is worth retrying.
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Run `op` until it finishes, fails permanently, or retries run out.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fail(e) => return Err(e),
            Attempt::Retry(e) => {
                if attempt >= config.max_retries {
                    return Err(e);
                }
                let delay = config.delay_for_attempt(attempt);
                tracing::debug!(
                    "Platform call failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt + 1,
                    config.max_retries,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
