//! Model client adapters: system instruction + ordered turns in, raw completion text out.
//!
//! Every provider failure (transport, non-2xx, unexpected body) surfaces as
//! [`VitaeError::ModelUnavailable`]. Nothing here retries; reissuing the same
//! history is the caller's retry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{VitaeError, VitaeResult};
use crate::turn::Turn;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-haiku-4.5";

/// Text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, turns: &[Turn], max_tokens: u32) -> VitaeResult<String>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// Anthropic Messages API
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API client.
#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            client: http_client(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, system: &str, turns: &[Turn], max_tokens: u32) -> VitaeResult<String> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens,
            system,
            messages: turns
                .iter()
                .map(|t| WireMessage {
                    role: t.role.as_str(),
                    content: &t.content,
                })
                .collect(),
        };

        let res = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| VitaeError::ModelUnavailable(format!("Anthropic request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(VitaeError::ModelUnavailable(format!(
                "Anthropic API error {}: {}",
                status, text
            )));
        }

        let parsed: AnthropicResponse = res
            .json()
            .await
            .map_err(|e| VitaeError::ModelUnavailable(format!("Anthropic response parse failed: {}", e)))?;

        parsed
            .content
            .into_iter()
            .find(|b| b.kind == "text")
            .and_then(|b| b.text)
            .ok_or_else(|| VitaeError::ModelUnavailable("Anthropic returned no text block".to_string()))
    }
}

// OpenAI-compatible request/response for OpenRouter
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter chat-completions client. The system instruction travels as a `system` message.
#[derive(Debug, Clone)]
pub struct OpenRouterGenerator {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            client: http_client(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    async fn generate(&self, system: &str, turns: &[Turn], max_tokens: u32) -> VitaeResult<String> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
        messages.extend(turns.iter().map(|t| WireMessage {
            role: t.role.as_str(),
            content: &t.content,
        }));
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
        };

        let res = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Vitae")
            .json(&body)
            .send()
            .await
            .map_err(|e| VitaeError::ModelUnavailable(format!("OpenRouter request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(VitaeError::ModelUnavailable(format!(
                "OpenRouter API error {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| VitaeError::ModelUnavailable(format!("OpenRouter response parse failed: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VitaeError::ModelUnavailable("OpenRouter returned no choices".to_string()))
    }
}

/// Placeholder generator: replays scripted replies and counts calls. Use for mock mode and tests.
#[derive(Debug, Default)]
pub struct PlaceholderGenerator {
    replies: Mutex<Vec<String>>,
    fail: bool,
    calls: AtomicUsize,
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies are returned in order; the last one repeats.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut replies: Vec<String> = replies.into_iter().map(Into::into).collect();
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            ..Self::default()
        }
    }

    /// Every call fails with `ModelUnavailable`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for PlaceholderGenerator {
    async fn generate(&self, _system: &str, turns: &[Turn], _max_tokens: u32) -> VitaeResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VitaeError::ModelUnavailable("placeholder generator offline".to_string()));
        }
        let mut replies = self
            .replies
            .lock()
            .map_err(|e| VitaeError::ModelUnavailable(format!("placeholder lock poisoned: {}", e)))?;
        let reply = if replies.len() > 1 {
            replies.pop()
        } else {
            replies.last().cloned()
        };
        Ok(reply.unwrap_or_else(|| {
            format!(
                "[placeholder reply to {} turn(s): configure ANTHROPIC_API_KEY or OPENROUTER_API_KEY]",
                turns.len()
            )
        }))
    }
}
