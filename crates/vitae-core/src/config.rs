//! Gateway configuration: defaults, then an optional TOML file, then `VITAE__*` env overrides.
//!
//! Provider secrets are not part of the file; they are read from plain env vars
//! (see [`Secrets`]).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VitaeResult;
use crate::interview::InterviewSpec;

pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

/// Which text generator backs the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    #[default]
    Anthropic,
    Openrouter,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub storage_path: String,
    pub blob_dir: String,
    /// Base URL under which `blob_dir` is served. Defaults to `http://{bind_addr}/blobs`.
    #[serde(default)]
    pub public_base_url: Option<String>,
    pub llm_mode: LlmMode,
    /// Model override for the selected provider.
    #[serde(default)]
    pub llm_model: Option<String>,
    /// TOML interview script; the built-in long form when unset.
    #[serde(default)]
    pub interview_spec_path: Option<String>,
}

impl GatewayConfig {
    /// Load from `VITAE_CONFIG` (default `config/gateway.toml`, skipped if missing) and `VITAE__*` env.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("VITAE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("bind_addr", "127.0.0.1:8000")?
            .set_default("storage_path", "./data/portfolios")?
            .set_default("blob_dir", "./data/blobs")?
            .set_default("llm_mode", "anthropic")?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VITAE").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}/blobs", self.bind_addr))
    }

    /// Interview script named by `interview_spec_path`, or the built-in default.
    pub fn interview_spec(&self) -> VitaeResult<InterviewSpec> {
        match self.interview_spec_path.as_deref() {
            Some(p) => InterviewSpec::from_toml_path(p),
            None => Ok(InterviewSpec::default()),
        }
    }
}

/// Provider credentials from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub anthropic_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: env_opt_string("ANTHROPIC_API_KEY"),
            openrouter_api_key: env_opt_string("OPENROUTER_API_KEY"),
            elevenlabs_api_key: env_opt_string("ELEVENLABS_API_KEY"),
            elevenlabs_agent_id: env_opt_string("ELEVENLABS_AGENT_ID"),
        }
    }
}

pub fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_file() {
        let cfg = GatewayConfig::load_from(Path::new("/nonexistent/vitae.toml")).unwrap();
        assert_eq!(cfg.storage_path, "./data/portfolios");
        assert_eq!(cfg.blob_dir, "./data/blobs");
        assert!(cfg.interview_spec_path.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "bind_addr = \"0.0.0.0:9000\"\nllm_mode = \"mock\"\nllm_model = \"m\"").unwrap();
        let cfg = GatewayConfig::load_from(file.path()).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.llm_mode, LlmMode::Mock);
        assert_eq!(cfg.llm_model.as_deref(), Some("m"));
        assert_eq!(cfg.public_base_url(), "http://0.0.0.0:9000/blobs");
    }

    #[test]
    fn missing_interview_spec_path_uses_default() {
        let cfg = GatewayConfig::load_from(Path::new("/nonexistent/vitae.toml")).unwrap();
        assert_eq!(cfg.interview_spec().unwrap().name, InterviewSpec::default().name);
    }
}
