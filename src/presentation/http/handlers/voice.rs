//! Voice Session Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use crate::application::dto::request::{ConnectVoiceRequest, DisconnectVoiceRequest};
use crate::application::dto::response::{
    ConnectVoiceResponse, MessageResponse, VoiceStatusResponse,
};
use crate::application::services::VoiceError;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// Join a voice channel
pub async fn connect(
    State(state): State<AppState>,
    Json(body): Json<ConnectVoiceRequest>,
) -> Result<Json<ConnectVoiceResponse>, AppError> {
    body.validate().map_err(validation_error)?;

    let request = body
        .into_dto()
        .ok_or_else(|| AppError::BadRequest("Missing token, guild_id or channel_id".into()))?;

    let outcome = state.voice.connect(request).await;
    Ok(Json(ConnectVoiceResponse::from(outcome)))
}

/// Leave a voice channel and release the gateway connection
pub async fn disconnect(
    State(state): State<AppState>,
    Json(body): Json<DisconnectVoiceRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let connection_id = body
        .connection_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::NotFound("Connection not found".into()))?;

    state
        .voice
        .disconnect(&connection_id)
        .await
        .map_err(|e| match e {
            VoiceError::NotFound => AppError::NotFound("Connection not found".into()),
        })?;

    Ok(Json(MessageResponse {
        message: "Disconnected",
    }))
}

/// Poll a voice session
pub async fn status(State(state): State<AppState>, Path(connection_id): Path<String>) -> Response {
    match state.voice.status(&connection_id) {
        Ok(status) => Json(VoiceStatusResponse::from(status)).into_response(),
        Err(VoiceError::NotFound) => {
            (StatusCode::NOT_FOUND, Json(VoiceStatusResponse::not_found())).into_response()
        }
    }
}
