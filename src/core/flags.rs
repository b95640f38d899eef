// src/core/flags.rs — Cooperative stop flags shared by a session's tasks

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// The two monotonic flags a capture task and its chat task coordinate through.
///
/// `cancel` means the operator stopped watching the channel; `cleanup` means
/// the capture ended on its own and only bookkeeping is left.
#[derive(Debug, Default)]
pub struct SessionFlags {
    cancel: AtomicBool,
    cleanup: AtomicBool,
    changed: Notify,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cancel(&self) {
        if !self.cancel.swap(true, Ordering::SeqCst) {
            self.changed.notify_waiters();
        }
    }

    pub fn request_cleanup(&self) {
        if !self.cleanup.swap(true, Ordering::SeqCst) {
            self.changed.notify_waiters();
        }
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn cleanup_requested(&self) -> bool {
        self.cleanup.load(Ordering::SeqCst)
    }

    pub fn should_stop(&self) -> bool {
        self.cancel_requested() || self.cleanup_requested()
    }

    /// Resolves once either flag is set.
    pub async fn stopped(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a set between check and await is not missed.
            notified.as_mut().enable();
            if self.should_stop() {
                return;
            }
            notified.await;
        }
    }
}
