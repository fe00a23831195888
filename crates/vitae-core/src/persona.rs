//! Persona synthesis (interview transcript → twin system prompt) and twin chat.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{VitaeError, VitaeResult};
use crate::model::TextGenerator;
use crate::portfolio::PortfolioRecord;
use crate::turn::{null_as_empty, Turn};

const PERSONA_DESIGNER_INSTRUCTION: &str = r#"Sei un esperto designer di personalità AI.
Analizza la seguente intervista tra un recruiter e un candidato.

Il tuo compito è:
1. Identificare il NOME del candidato. Se non è esplicito, inventa un nome professionale adatto o usa "Professionista AI".
2. Creare un SYSTEM PROMPT dettagliato per il suo gemello digitale (tono, esperienze, skill, valori).
3. Il prompt deve istruire l'AI a parlare SEMPRE in ITALIANO.

Rispondi SOLAMENTE con un oggetto JSON valido (senza markdown) in questo formato:
{
  "name": "Nome Candidato",
  "system_prompt": "Testo del system prompt..."
}"#;

/// Appended to every twin's system prompt; replies are read aloud.
pub const VOICE_REPLY_SUFFIX: &str = "\n\nIMPORTANTE: Rispondi SEMPRE in ITALIANO. Sii breve (1-3 frasi) e colloquiale, le tue risposte verranno lette da una voce sintetica.";

pub const DEFAULT_PERSONA_NAME: &str = "Professionista AI";

const PERSONA_MAX_TOKENS: u32 = 2000;
const TWIN_MAX_TOKENS: u32 = 300;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\r?\n?").expect("valid code fence regex"));

/// Name and system prompt for a new twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDraft {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub system_prompt: String,
}

fn parse_draft(reply: &str) -> VitaeResult<PersonaDraft> {
    let cleaned = CODE_FENCE.replace_all(reply, "");
    let cleaned = cleaned.trim();
    let body = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &cleaned[start..=end],
        _ => cleaned,
    };
    let mut draft: PersonaDraft = serde_json::from_str(body)
        .map_err(|e| VitaeError::InvalidModelOutput(format!("persona draft: {}", e)))?;
    if draft.system_prompt.trim().is_empty() {
        return Err(VitaeError::InvalidModelOutput(
            "persona draft has an empty system prompt".to_string(),
        ));
    }
    if draft.name.trim().is_empty() {
        draft.name = DEFAULT_PERSONA_NAME.to_string();
    }
    Ok(draft)
}

/// Turns a finished interview into a twin persona.
pub struct PersonaSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl PersonaSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// The transcript goes to the model as a single JSON-encoded user turn.
    pub async fn synthesize(&self, history: &[Turn]) -> VitaeResult<PersonaDraft> {
        if history.is_empty() {
            return Err(VitaeError::InvalidInput("interview history is empty".to_string()));
        }
        let transcript = serde_json::to_string(history)?;
        let reply = self
            .generator
            .generate(
                PERSONA_DESIGNER_INSTRUCTION,
                &[Turn::user(transcript)],
                PERSONA_MAX_TOKENS,
            )
            .await?;
        let draft = parse_draft(&reply)?;
        tracing::info!(name = %draft.name, "[VITAE] Persona synthesized");
        Ok(draft)
    }
}

/// Visitor conversation with a finalized twin.
pub struct TwinChat {
    generator: Arc<dyn TextGenerator>,
}

impl TwinChat {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn reply(
        &self,
        portfolio: &PortfolioRecord,
        history: &[Turn],
        message: &str,
    ) -> VitaeResult<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(VitaeError::InvalidInput("message is empty".to_string()));
        }
        let mut turns = history.to_vec();
        turns.push(Turn::user(message));
        let system = format!("{}{}", portfolio.system_prompt, VOICE_REPLY_SUFFIX);
        self.generator.generate(&system, &turns, TWIN_MAX_TOKENS).await
    }
}
