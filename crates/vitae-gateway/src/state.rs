//! Shared handler state, wired from [`GatewayConfig`] and provider secrets.

use std::sync::Arc;

use vitae_core::{
    AnthropicGenerator, BlobStore, ElevenLabsVoice, GatewayConfig, InterviewEngine, InterviewSpec,
    LlmMode, LocalBlobStore, OpenRouterGenerator, PersonaSynthesizer, PlaceholderBlobStore,
    PlaceholderGenerator, PlaceholderVoice, PortfolioStore, Secrets, TextGenerator, TwinChat,
    VoiceCapability,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InterviewEngine>,
    pub persona: Arc<PersonaSynthesizer>,
    pub twin: Arc<TwinChat>,
    pub voice: Arc<dyn VoiceCapability>,
    pub blobs: Arc<dyn BlobStore>,
    pub store: PortfolioStore,
    pub agent_id: Option<String>,
}

impl AppState {
    pub fn new(
        spec: InterviewSpec,
        generator: Arc<dyn TextGenerator>,
        voice: Arc<dyn VoiceCapability>,
        blobs: Arc<dyn BlobStore>,
        store: PortfolioStore,
        agent_id: Option<String>,
    ) -> Self {
        Self {
            engine: Arc::new(InterviewEngine::new(spec, generator.clone())),
            persona: Arc::new(PersonaSynthesizer::new(generator.clone())),
            twin: Arc::new(TwinChat::new(generator)),
            voice,
            blobs,
            store,
            agent_id,
        }
    }

    /// Production wiring. Missing credentials degrade to placeholders with a warning.
    pub fn from_config(config: &GatewayConfig, secrets: &Secrets) -> vitae_core::VitaeResult<Self> {
        let spec = config.interview_spec()?;
        tracing::info!(spec = %spec.name, areas = spec.topic_areas.len(), "[VITAE] Interview script loaded");

        let store = PortfolioStore::shared(Some(&config.storage_path))?.clone();

        Ok(Self::new(
            spec,
            generator_for(config, secrets),
            voice_for(secrets),
            blobs_for(config),
            store,
            secrets.elevenlabs_agent_id.clone(),
        ))
    }
}

fn generator_for(config: &GatewayConfig, secrets: &Secrets) -> Arc<dyn TextGenerator> {
    let model = config.llm_model.as_deref();
    match config.llm_mode {
        LlmMode::Anthropic => match &secrets.anthropic_api_key {
            Some(key) => {
                let mut generator = AnthropicGenerator::new(key.as_str());
                if let Some(m) = model {
                    generator = generator.with_model(m);
                }
                tracing::info!("[VITAE] Text generation: Anthropic");
                Arc::new(generator)
            }
            None => placeholder_generator("ANTHROPIC_API_KEY"),
        },
        LlmMode::Openrouter => match &secrets.openrouter_api_key {
            Some(key) => {
                let mut generator = OpenRouterGenerator::new(key.as_str());
                if let Some(m) = model {
                    generator = generator.with_model(m);
                }
                tracing::info!("[VITAE] Text generation: OpenRouter");
                Arc::new(generator)
            }
            None => placeholder_generator("OPENROUTER_API_KEY"),
        },
        LlmMode::Mock => {
            tracing::info!("[VITAE] Text generation: mock");
            Arc::new(PlaceholderGenerator::new())
        }
    }
}

fn placeholder_generator(missing: &str) -> Arc<dyn TextGenerator> {
    tracing::warn!("[VITAE] {} not set; using placeholder text generator", missing);
    Arc::new(PlaceholderGenerator::new())
}

fn voice_for(secrets: &Secrets) -> Arc<dyn VoiceCapability> {
    match &secrets.elevenlabs_api_key {
        Some(key) => Arc::new(ElevenLabsVoice::new(key.as_str())),
        None => {
            tracing::warn!("[VITAE] ELEVENLABS_API_KEY not set; using placeholder voice");
            Arc::new(PlaceholderVoice::new())
        }
    }
}

fn blobs_for(config: &GatewayConfig) -> Arc<dyn BlobStore> {
    if config.blob_dir.trim().is_empty() {
        tracing::warn!("[VITAE] blob_dir is empty; photo uploads return mock avatars");
        return Arc::new(PlaceholderBlobStore);
    }
    Arc::new(LocalBlobStore::new(&config.blob_dir, config.public_base_url()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitae_core::Turn;

    fn config(mode: LlmMode) -> GatewayConfig {
        GatewayConfig {
            bind_addr: "127.0.0.1:0".into(),
            storage_path: "./unused".into(),
            blob_dir: String::new(),
            public_base_url: None,
            llm_mode: mode,
            llm_model: None,
            interview_spec_path: None,
        }
    }

    #[tokio::test]
    async fn missing_credentials_degrade_to_placeholders() {
        let secrets = Secrets::default();
        let generator = generator_for(&config(LlmMode::Anthropic), &secrets);
        assert!(generator.generate("", &[Turn::user("ciao")], 10).await.is_ok());

        let voice = voice_for(&secrets);
        let url = voice.signed_conversation_url("agent-7").await.unwrap();
        assert!(url.contains("agent-7"));
    }

    #[tokio::test]
    async fn empty_blob_dir_uses_mock_avatars() {
        let blobs = blobs_for(&config(LlmMode::Mock));
        let blob = blobs.store_blob("foto.png", b"png", "image/png").await.unwrap();
        assert!(blob.warning.is_some());
    }
}
