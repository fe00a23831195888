//! Error types for the Vitae core.

use thiserror::Error;

/// Result type alias for Vitae operations
pub type VitaeResult<T> = Result<T, VitaeError>;

/// Errors that can escape a Vitae operation.
///
/// Recoverable payload problems never show up here; they are carried inside
/// [`crate::ParsedReply`] as a [`PayloadParseError`].
#[derive(Error, Debug)]
pub enum VitaeError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model returned unusable output: {0}")]
    InvalidModelOutput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Voice provider failure: {0}")]
    UpstreamVoiceFailure(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for VitaeError {
    fn from(err: config::ConfigError) -> Self {
        VitaeError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for VitaeError {
    fn from(err: toml::de::Error) -> Self {
        VitaeError::Config(err.to_string())
    }
}

/// Recoverable problem with the structured payload embedded in a model reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadParseError {
    /// No fenced block or object literal was found in the reply.
    #[error("no structured payload in reply")]
    Missing,

    /// A candidate payload was found but did not parse (usually truncation).
    #[error("malformed structured payload: {0}")]
    Malformed(String),
}

impl serde::Serialize for PayloadParseError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
