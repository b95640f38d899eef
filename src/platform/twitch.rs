// src/platform/twitch.rs — Twitch Helix status client
//
// Uses the Helix API (https://dev.twitch.tv/docs/api/reference) with an app
// access token from the client-credentials flow.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use super::retry::{is_retriable_status, with_retry, Attempt, RetryConfig};
use super::PlatformStatusClient;
use crate::core::types::{ChannelInfo, LiveStatus, StreamState};
use crate::infra::config::PlatformConfig;
use crate::infra::errors::RecorderError;

/// Helix accepts at most this many logins / user IDs per request.
const MAX_IDS_PER_REQUEST: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// Broadcast types that count as live.
const VALID_BROADCAST: &[&str] = &["live"];

pub struct TwitchClient {
    client: Client,
    api_base: String,
    auth_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    retry: RetryConfig,
    token: Mutex<Option<String>>,
}

// -- Helix response types --

#[derive(Deserialize)]
struct HelixPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct HelixUser {
    id: String,
    login: String,
    display_name: String,
}

#[derive(Deserialize)]
struct HelixStream {
    user_id: String,
    #[serde(rename = "type", default)]
    kind: String,
    title: Option<String>,
    viewer_count: Option<u64>,
    started_at: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl TwitchClient {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            retry: RetryConfig::from_platform(config),
            token: Mutex::new(None),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), RecorderError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(RecorderError::Config(
                "platform.client_id and platform.client_secret are required".into(),
            )),
        }
    }

    /// Fetch (or reuse) an app access token.
    async fn access_token(&self) -> Result<String, RecorderError> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            return Ok(token.clone());
        }

        let (client_id, client_secret) = self.credentials()?;
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ],
        )
        .map_err(|e| RecorderError::Config(format!("invalid auth_url: {e}")))?;

        let resp = self
            .client
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RecorderError::transport("helix", e))?;
        if !resp.status().is_success() {
            return Err(RecorderError::transport(
                "helix",
                format!("token request returned {}", resp.status()),
            ));
        }
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| RecorderError::transport("helix", e))?;

        *cached = Some(body.access_token.clone());
        Ok(body.access_token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RecorderError> {
        let (client_id, _) = self.credentials()?;
        let token = self.access_token().await?;

        let result = with_retry(&self.retry, || {
            let request = self
                .client
                .get(url.clone())
                .header("Client-ID", client_id)
                .bearer_auth(&token)
                .timeout(REQUEST_TIMEOUT);
            async move {
                match request.send().await {
                    Ok(resp) if resp.status().is_success() => match resp.json::<T>().await {
                        Ok(body) => Attempt::Done(body),
                        Err(e) => Attempt::Fail(RecorderError::transport("helix", e)),
                    },
                    Ok(resp) => {
                        let status = resp.status();
                        let text = resp.text().await.unwrap_or_default();
                        let err = RecorderError::transport(
                            "helix",
                            format!("{status}: {}", crate::util::truncate_str(&text, 200)),
                        );
                        if status == StatusCode::UNAUTHORIZED {
                            Attempt::Fail(err)
                        } else if is_retriable_status(status.as_u16()) {
                            Attempt::Retry(err)
                        } else {
                            Attempt::Fail(err)
                        }
                    }
                    Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                        Attempt::Retry(RecorderError::transport("helix", e))
                    }
                    Err(e) => Attempt::Fail(RecorderError::transport("helix", e)),
                }
            }
        })
        .await;

        if let Err(RecorderError::Transport { ref message, .. }) = result {
            if message.starts_with("401") {
                // Token expired or revoked: fetch a fresh one next call.
                *self.token.lock().await = None;
            }
        }
        result
    }

    fn endpoint<'a>(
        &self,
        path: &str,
        key: &str,
        values: impl Iterator<Item = &'a String>,
    ) -> Result<Url, RecorderError> {
        let params: Vec<(&str, &str)> = values.map(|v| (key, v.as_str())).collect();
        Url::parse_with_params(&format!("{}/{path}", self.api_base), params)
            .map_err(|e| RecorderError::Config(format!("invalid api_base: {e}")))
    }
}

#[async_trait]
impl PlatformStatusClient for TwitchClient {
    async fn resolve_ids(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, ChannelInfo>, RecorderError> {
        let mut resolved = HashMap::new();
        for chunk in names.chunks(MAX_IDS_PER_REQUEST) {
            let url = self.endpoint("users", "login", chunk.iter())?;
            let page: HelixPage<HelixUser> = self.get_json(url).await?;
            for user in page.data {
                resolved.insert(
                    user.login.to_lowercase(),
                    ChannelInfo {
                        id: user.id,
                        login: user.login,
                        display_name: user.display_name,
                    },
                );
            }
        }
        Ok(resolved)
    }

    async fn live_status(&self, ids: &[String]) -> HashMap<String, LiveStatus> {
        let mut statuses: HashMap<String, LiveStatus> = ids
            .iter()
            .map(|id| (id.clone(), LiveStatus::offline()))
            .collect();

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let url = match self.endpoint("streams", "user_id", chunk.iter()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping live status round: {}", e);
                    return statuses;
                }
            };
            match self.get_json::<HelixPage<HelixStream>>(url).await {
                Ok(page) => {
                    for stream in page.data {
                        if !VALID_BROADCAST.contains(&stream.kind.as_str()) {
                            continue;
                        }
                        statuses.insert(
                            stream.user_id,
                            LiveStatus {
                                state: StreamState::Online,
                                title: Some(stream.title.unwrap_or_else(|| "No Title".into())),
                                viewer_count: stream.viewer_count,
                                started_at: stream.started_at,
                            },
                        );
                    }
                }
                Err(e) => {
                    // The chunk stays offline, so active captures in it are
                    // asked to clean up this round. A hung call is instead
                    // bounded by the caller's timeout, which changes nothing.
                    tracing::warn!(
                        "Error fetching stream info for {} id(s), reporting them offline: {}",
                        chunk.len(),
                        e
                    );
                }
            }
        }

        statuses
    }
}
