//! HTTP error mapping. Callers see a short fixed message; details stay in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use vitae_core::VitaeError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    BadRequest(String),
    /// `field` names the JSON key the message is sent under.
    Internal {
        field: &'static str,
        message: &'static str,
    },
}

impl ApiError {
    /// Map a core error, using `message` for anything that is not a caller mistake.
    pub fn context(message: &'static str) -> impl FnOnce(VitaeError) -> ApiError {
        move |err| Self::classify(err, "error", message)
    }

    /// Like [`ApiError::context`] but the message goes under `"message"` so chat UIs can show it inline.
    pub fn conversational(message: &'static str) -> impl FnOnce(VitaeError) -> ApiError {
        move |err| Self::classify(err, "message", message)
    }

    fn classify(err: VitaeError, field: &'static str, message: &'static str) -> ApiError {
        match err {
            VitaeError::NotFound(what) => {
                tracing::info!(what = %what, "[VITAE] Not found");
                ApiError::NotFound("Portfolio not found")
            }
            VitaeError::InvalidInput(reason) => ApiError::BadRequest(reason),
            other => {
                tracing::error!(error = %other, "[VITAE] {}", message);
                ApiError::Internal { field, message }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "error", m.to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "error", m),
            ApiError::Internal { field, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, field, message.to_string())
            }
        };
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), serde_json::Value::String(message));
        (status, Json(serde_json::Value::Object(body))).into_response()
    }
}
