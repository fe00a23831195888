//! Public portfolio routes: profile view, twin chat, speech and live-agent token.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use vitae_core::portfolio::require_portfolio;
use vitae_core::{speak_with_fallback, PortfolioSummary, Turn};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PortfolioSummary>, ApiError> {
    let record =
        require_portfolio(&state.store, &slug).map_err(ApiError::context("Failed to load portfolio"))?;
    Ok(Json(PortfolioSummary::from(&record)))
}

#[derive(Deserialize)]
pub struct TwinChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<Turn>,
}

pub async fn chat(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<TwinChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = require_portfolio(&state.store, &slug).map_err(ApiError::context("Chat failed"))?;
    let message = state
        .twin
        .reply(&record, &body.history, &body.message)
        .await
        .map_err(ApiError::context("Chat failed"))?;
    Ok(Json(serde_json::json!({ "message": message })))
}

#[derive(Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Audio for `text`. Without an explicit `voice_id` the portfolio's own voice is used when it exists.
pub async fn speak(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<SpeakRequest>,
) -> Result<Response, ApiError> {
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_string()));
    }
    let voice_id = match body.voice_id {
        Some(id) => Some(id),
        None => state
            .store
            .get_portfolio(&slug)
            .map_err(ApiError::context("TTS failed"))?
            .map(|r| r.voice_id),
    };
    let audio = speak_with_fallback(state.voice.as_ref(), &body.text, voice_id.as_deref())
        .await
        .map_err(ApiError::context("TTS failed"))?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

pub async fn token(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_portfolio(&state.store, &slug).map_err(ApiError::context("Failed to generate token"))?;
    let Some(agent_id) = state.agent_id.as_deref() else {
        tracing::error!("[VITAE] ELEVENLABS_AGENT_ID not set");
        return Err(ApiError::Internal {
            field: "error",
            message: "Server configuration error",
        });
    };
    let url = state
        .voice
        .signed_conversation_url(agent_id)
        .await
        .map_err(ApiError::context("Failed to generate token"))?;
    Ok(Json(serde_json::json!({ "signedUrl": url })))
}
