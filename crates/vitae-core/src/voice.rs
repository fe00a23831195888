//! **Voice capability**: cloning, speech synthesis and conversational-agent tokens.
//!
//! Cloning degrades to a stock voice instead of failing the onboarding flow.
//! Speech with a custom voice is retried once with the stock speech voice.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{VitaeError, VitaeResult};
use crate::portfolio::DEFAULT_VOICE_SENTINEL;

/// Voice used when cloning fails (typically a subscription tier limit).
pub const DEFAULT_CLONE_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
/// Voice used for playback when a portfolio has none of its own.
pub const DEFAULT_SPEECH_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";

const CLONE_FALLBACK_WARNING: &str = "Cloning failed (likely tier limit), using default voice.";

const ELEVENLABS_BASE: &str = "https://api.elevenlabs.io/v1";
const SPEECH_MODEL: &str = "eleven_multilingual_v2";

/// Recorded voice sample uploaded for cloning.
#[derive(Debug, Clone)]
pub struct VoiceSample {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a clone attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceClone {
    pub voice_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Voice provider operations.
#[async_trait]
pub trait VoiceCapability: Send + Sync {
    /// Create a cloned voice from a sample; returns the provider voice id.
    async fn clone_voice(&self, name: &str, sample: &VoiceSample) -> VitaeResult<String>;

    /// Synthesize `text` with `voice_id`; returns MPEG audio bytes.
    async fn synthesize(&self, text: &str, voice_id: &str) -> VitaeResult<Vec<u8>>;

    /// Signed websocket URL for a live conversation with `agent_id`.
    async fn signed_conversation_url(&self, agent_id: &str) -> VitaeResult<String>;
}

/// Clone a voice, or fall back to the stock voice with a warning.
pub async fn clone_or_default(
    voice: &dyn VoiceCapability,
    name: &str,
    sample: &VoiceSample,
) -> VoiceClone {
    match voice.clone_voice(name, sample).await {
        Ok(voice_id) => {
            tracing::info!(voice_id = %voice_id, "[VITAE] Voice cloned");
            VoiceClone {
                voice_id,
                warning: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "[VITAE] Voice cloning failed, using default voice");
            VoiceClone {
                voice_id: DEFAULT_CLONE_VOICE_ID.to_string(),
                warning: Some(CLONE_FALLBACK_WARNING.to_string()),
            }
        }
    }
}

/// `None`, blank and the `"default"` sentinel all map to the stock speech voice.
pub fn resolve_voice_id(voice_id: Option<&str>) -> &str {
    match voice_id.map(str::trim) {
        Some(id) if !id.is_empty() && id != DEFAULT_VOICE_SENTINEL => id,
        _ => DEFAULT_SPEECH_VOICE_ID,
    }
}

/// Synthesize with the requested voice; a custom voice that fails is retried once with the stock voice.
pub async fn speak_with_fallback(
    voice: &dyn VoiceCapability,
    text: &str,
    voice_id: Option<&str>,
) -> VitaeResult<Vec<u8>> {
    let resolved = resolve_voice_id(voice_id);
    match voice.synthesize(text, resolved).await {
        Ok(audio) => Ok(audio),
        Err(e) if resolved != DEFAULT_SPEECH_VOICE_ID => {
            tracing::warn!(voice_id = %resolved, error = %e, "[VITAE] Speech failed, retrying with default voice");
            voice
                .synthesize(text, DEFAULT_SPEECH_VOICE_ID)
                .await
                .map_err(upstream)
        }
        Err(e) => Err(upstream(e)),
    }
}

fn upstream(err: VitaeError) -> VitaeError {
    match err {
        VitaeError::UpstreamVoiceFailure(_) => err,
        other => VitaeError::UpstreamVoiceFailure(other.to_string()),
    }
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Deserialize)]
struct AddVoiceResponse {
    voice_id: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    signed_url: String,
}

/// ElevenLabs client. Authenticates with the `xi-api-key` header.
#[derive(Debug, Clone)]
pub struct ElevenLabsVoice {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ElevenLabsVoice {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.into().trim().to_string(),
            base_url: ELEVENLABS_BASE.to_string(),
            client,
        }
    }

    async fn check(res: reqwest::Response, what: &str) -> VitaeResult<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(VitaeError::UpstreamVoiceFailure(format!(
            "ElevenLabs {} error {}: {}",
            what, status, body
        )))
    }
}

fn transport(what: &str, e: reqwest::Error) -> VitaeError {
    VitaeError::UpstreamVoiceFailure(format!("ElevenLabs {} request failed: {}", what, e))
}

#[async_trait]
impl VoiceCapability for ElevenLabsVoice {
    async fn clone_voice(&self, name: &str, sample: &VoiceSample) -> VitaeResult<String> {
        let part = reqwest::multipart::Part::bytes(sample.bytes.clone())
            .file_name(sample.file_name.clone())
            .mime_str(&sample.content_type)
            .map_err(|e| transport("clone", e))?;
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("description", "Cloned voice for Vitae portfolio")
            .part("files", part);

        let res = self
            .client
            .post(format!("{}/voices/add", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport("clone", e))?;
        let res = Self::check(res, "clone").await?;
        let parsed: AddVoiceResponse = res.json().await.map_err(|e| transport("clone", e))?;
        Ok(parsed.voice_id)
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> VitaeResult<Vec<u8>> {
        let body = SpeechRequest {
            text,
            model_id: SPEECH_MODEL,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let res = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("speech", e))?;
        let res = Self::check(res, "speech").await?;
        let bytes = res.bytes().await.map_err(|e| transport("speech", e))?;
        Ok(bytes.to_vec())
    }

    async fn signed_conversation_url(&self, agent_id: &str) -> VitaeResult<String> {
        let res = self
            .client
            .get(format!("{}/convai/conversation/get_signed_url", self.base_url))
            .query(&[("agent_id", agent_id)])
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| transport("token", e))?;
        let res = Self::check(res, "token").await?;
        let parsed: SignedUrlResponse = res.json().await.map_err(|e| transport("token", e))?;
        Ok(parsed.signed_url)
    }
}

/// Offline voice provider for mock mode and tests.
///
/// Cloning returns `placeholder-<name>` unless `fail_clone` is set. Synthesis
/// returns an empty buffer and fails for any voice id listed in `failing_voices`.
#[derive(Debug, Default)]
pub struct PlaceholderVoice {
    pub fail_clone: bool,
    pub failing_voices: Vec<String>,
    synth_calls: AtomicUsize,
}

impl PlaceholderVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_clone() -> Self {
        Self {
            fail_clone: true,
            ..Self::default()
        }
    }

    pub fn failing_voices<I, S>(voices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_voices: voices.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn synth_calls(&self) -> usize {
        self.synth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceCapability for PlaceholderVoice {
    async fn clone_voice(&self, name: &str, _sample: &VoiceSample) -> VitaeResult<String> {
        if self.fail_clone {
            return Err(VitaeError::UpstreamVoiceFailure("placeholder clone refused".to_string()));
        }
        Ok(format!("placeholder-{}", name.trim().replace(' ', "-").to_lowercase()))
    }

    async fn synthesize(&self, _text: &str, voice_id: &str) -> VitaeResult<Vec<u8>> {
        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_voices.iter().any(|v| v == voice_id) {
            return Err(VitaeError::UpstreamVoiceFailure(format!(
                "placeholder voice {} unavailable",
                voice_id
            )));
        }
        Ok(Vec::new())
    }

    async fn signed_conversation_url(&self, agent_id: &str) -> VitaeResult<String> {
        Ok(format!("wss://placeholder.invalid/convai?agent_id={}", agent_id))
    }
}
