//! Onboarding: the interview itself, asset uploads and portfolio creation.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use vitae_core::{
    clone_or_default, create_portfolio, NewPortfolio, PersonaDraft, StoredBlob, Turn, TurnRequest,
    TurnResponse, VoiceClone, VoiceSample,
};

use super::read_upload_form;
use crate::error::ApiError;
use crate::state::AppState;

pub const CHAT_APOLOGY: &str = "Ho qualche problema a connettermi al mio cervello.";

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let response = state
        .engine
        .submit_turn(request)
        .await
        .map_err(ApiError::conversational(CHAT_APOLOGY))?;
    Ok(Json(response))
}

fn clone_name() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("User Clone {}", millis)
}

pub async fn voice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<VoiceClone>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let sample = VoiceSample {
        file_name: upload.file_name,
        content_type: upload.content_type,
        bytes: upload.bytes,
    };
    let name = form.name.unwrap_or_else(clone_name);
    Ok(Json(clone_or_default(state.voice.as_ref(), &name, &sample).await))
}

pub async fn photo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<StoredBlob>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let blob = state
        .blobs
        .store_blob(&upload.file_name, &upload.bytes, &upload.content_type)
        .await
        .map_err(ApiError::context("Photo upload failed"))?;
    Ok(Json(blob))
}

#[derive(Deserialize)]
pub struct GeneratePromptRequest {
    #[serde(default)]
    pub history: Vec<Turn>,
}

pub async fn generate_prompt(
    State(state): State<AppState>,
    Json(body): Json<GeneratePromptRequest>,
) -> Result<Json<PersonaDraft>, ApiError> {
    let draft = state
        .persona
        .synthesize(&body.history)
        .await
        .map_err(ApiError::context("Failed to generate prompt"))?;
    Ok(Json(draft))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewPortfolio>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = create_portfolio(&state.store, body)
        .await
        .map_err(ApiError::context("Failed to create portfolio"))?;
    Ok(Json(serde_json::json!({ "success": true, "slug": record.slug })))
}
