// src/platform/mod.rs — Streaming platform status API

pub mod retry;
pub mod twitch;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::core::types::{ChannelInfo, LiveStatus};
use crate::infra::errors::RecorderError;

/// Answers "who is this channel" and "which of these channels are live".
#[async_trait]
pub trait PlatformStatusClient: Send + Sync {
    /// Resolve login names to channel identities. Names the platform does not
    /// know are absent from the returned map.
    async fn resolve_ids(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, ChannelInfo>, RecorderError>;

    /// Live status for every requested ID. Never fails on transient network
    /// trouble: any ID that could not be confirmed is reported offline.
    async fn live_status(&self, ids: &[String]) -> HashMap<String, LiveStatus>;
}
