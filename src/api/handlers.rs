// src/api/handlers.rs

use crate::api::{auth, types::*, ApiState};
use crate::core::{PollReport, Snapshot};
use crate::infra::errors::RecorderError;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: RecorderError) -> ApiError {
    let status = match err {
        RecorderError::InvalidQuality { .. } => StatusCode::BAD_REQUEST,
        RecorderError::UnknownChannel { .. } | RecorderError::NotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        RecorderError::Transport { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// GET /api/v1/streamers — Channels being captured and watchlisted.
pub async fn list_streamers(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Snapshot>, ApiError> {
    auth::check_auth(&state, &headers)?;
    Ok(Json(state.orchestrator.snapshot().await))
}

/// POST /api/v1/streamers — Register a channel.
pub async fn add_streamer(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<AddStreamerRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    auth::check_auth(&state, &headers)?;

    if body.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Channel name cannot be empty".into(),
            }),
        ));
    }

    let quality = body.quality.unwrap_or_else(|| state.default_quality.clone());
    let message = state
        .orchestrator
        .register(&body.name, &quality)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// DELETE /api/v1/streamers/{name} — Stop watching a channel.
pub async fn remove_streamer(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth::check_auth(&state, &headers)?;
    let message = state
        .orchestrator
        .unregister(&name)
        .await
        .map_err(error_response)?;
    Ok(Json(MessageResponse { message }))
}

/// POST /api/v1/poll — Run one status round now.
pub async fn poll_now(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<PollReport>, ApiError> {
    auth::check_auth(&state, &headers)?;
    Ok(Json(state.orchestrator.poll_once().await))
}

/// PUT /api/v1/settings — Change the poll interval and/or download folder.
pub async fn update_settings(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    auth::check_auth(&state, &headers)?;

    if let Some(secs) = body.poll_interval_secs {
        state.orchestrator.set_interval(secs).await;
    }
    if let Some(ref folder) = body.download_folder {
        state.orchestrator.set_download_folder(folder).await;
    }
    Ok(Json(SettingsResponse {
        poll_interval_secs: state.orchestrator.poll_interval().await.as_secs(),
        download_folder: body.download_folder,
    }))
}

/// POST /api/v1/shutdown — Ask the daemon to exit.
pub async fn shutdown(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    auth::check_auth(&state, &headers)?;
    state.shutdown.notify_one();
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Daemon is shutting down".into(),
        }),
    ))
}

/// GET /api/v1/health — Simple health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
