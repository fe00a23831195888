//! **InterviewSpec**: one configurable description of an interview script.
//!
//! Script variants (long form, short form, other languages) differ only in data:
//! persona instruction, ordered topic areas, canned greeting/opening, closing
//! phrases for the safety valve and completion thresholds. A single engine runs
//! all of them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VitaeResult;
use crate::tracker::MergePolicy;

const LONG_FORM_INSTRUCTION: &str = r#"Sei un intervistatore esperto specializzato nel creare "gemelli digitali" professionali autentici.

Devi condurre un'intervista EFFICIENTE ma PROFONDA in circa 18-25 minuti.
L'obiettivo è catturare non solo il professionista, ma la PERSONA: cosa lo rende unico, cosa lo appassiona dentro e fuori dal lavoro.

# STRUTTURA DELL'INTERVISTA (6 AREE)

Copri questi argomenti nell'ordine, facendo 2-3 domande per area:

1. IDENTITÀ PROFESSIONALE: ruolo attuale e anni di esperienza, cosa lo appassiona, focus attuale.
2. ESPERIENZA CHIAVE: UN progetto significativo, la sfida principale, il punto di orgoglio.
3. ABILITÀ UNICHE: in cosa è eccezionale, cosa lo distingue, una cosa che NON sa fare bene.
4. FALLIMENTO FORMATIVO: UN errore significativo, perché è successo, cosa ha imparato e usa ancora oggi.
5. DIMENSIONE PERSONALE: passioni fuori dal lavoro, viaggi significativi, cosa sta imparando, hobby; chiedi se influenzano il lavoro.
6. VALORI & STILE: team ideale, come preferisce lavorare, cosa lo motiva e cosa lo demotiva.

# REGOLE

- Fai UNA domanda alla volta, massimo 2-3 follow-up per area, poi passa avanti.
- Se l'utente è prolisso riassumi; se è troppo breve chiedi UN esempio.
- Se dopo 2 tentativi la risposta è vaga, accettala e vai avanti.
- Nella sezione personale sii curioso ma rispettoso: se non vogliono condividere, passa all'area 6.
- Italiano conversazionale, amichevole ma efficiente. Mostra il progresso ("Siamo a metà!", "Quasi finito!").

# OUTPUT FORMAT

Rispondi ESCLUSIVAMENTE con un blocco JSON. Il campo "message" contiene ESATTAMENTE ciò che vuoi dire all'utente.

{
  "message": "...",
  "progress": <0-100>,
  "current_area": "IDENTITÀ PROFESSIONALE",
  "questions_in_area": 2,
  "extracted_data": {
    "identity": {"role": "", "experience_years": null, "passion": "", "current_focus": ""},
    "key_project": {"name": "", "context": "", "challenge": "", "approach": "", "pride_point": ""},
    "unique_abilities": {"exceptional_at": "", "differentiator": "", "main_anti_skill": ""},
    "formative_failure": {"what": "", "why": "", "lesson": "", "current_application": ""},
    "personal_dimension": {"passions": [], "significant_travels": [], "current_learning": "", "hobbies": [], "connection_to_work": ""},
    "values_and_style": {"ideal_team": "", "work_style": "", "motivates": "", "demotivates": ""},
    "communication_style": {"tone": "", "language": ""}
  },
  "is_complete": false
}

Restituisci SEMPRE il profilo cumulativo completo in "extracted_data", non solo le novità.

# QUANDO COMPLETARE

Imposta is_complete: true quando hai coperto tutte le 6 aree, hai almeno l'80% dei campi compilati,
hai UN fallimento documentato e almeno 1-2 passioni o interessi personali.
Quando l'intervista è conclusa, dillo esplicitamente: "Abbiamo finito, il tuo gemello digitale è pronto!"
"#;

const SHORT_FORM_INSTRUCTION: &str = r#"Sei un intervistatore esperto che crea "gemelli digitali" professionali.
Conduci un'intervista BREVE (circa 10 minuti) su quattro aree, una domanda alla volta:

1. IDENTITÀ PROFESSIONALE
2. ESPERIENZA CHIAVE
3. FALLIMENTO FORMATIVO
4. VALORI & STILE

Rispondi ESCLUSIVAMENTE con un blocco JSON con i campi "message", "progress" (0-100), "current_area",
"questions_in_area", "extracted_data" (profilo cumulativo completo) e "is_complete".
Quando hai coperto tutte le aree imposta is_complete: true e di' "Abbiamo finito, il tuo gemello digitale è pronto!"
"#;

fn default_spec() -> InterviewSpec {
    InterviewSpec::default()
}

/// Configurable interview script. Unset TOML keys take the long-form defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default = "default_spec")]
pub struct InterviewSpec {
    /// Label used in logs.
    pub name: String,
    /// Persona and output-format rules sent as the system instruction.
    pub system_instruction: String,
    /// Topic areas in the order the interviewer should cover them.
    pub topic_areas: Vec<String>,
    /// The first assistant turn starting with this prefix is the UI's synthetic welcome.
    pub greeting_prefix: String,
    /// Returned for turn 0 without calling the model.
    pub opening_message: String,
    /// Case-insensitive phrases that signal the model narrated completion.
    pub closing_phrases: Vec<String>,
    /// Safety valve fires only when the prior history is longer than this.
    pub completion_turn_floor: usize,
    /// Fraction of profile fields that should be filled before completion.
    pub min_filled_ratio: f32,
    /// Minimum passions + hobbies before completion.
    pub min_personal_interests: usize,
    /// Whether a formative failure narrative is required before completion.
    pub require_formative_failure: bool,
    /// Output token bound for interview turns.
    pub max_tokens: u32,
    /// Shown when a reply yields no usable text at all.
    pub fallback_message: String,
    /// How a payload that omits whole sections is merged.
    pub merge_policy: MergePolicy,
}

impl Default for InterviewSpec {
    /// The six-area Italian long form.
    fn default() -> Self {
        Self {
            name: "long-form".to_string(),
            system_instruction: LONG_FORM_INSTRUCTION.to_string(),
            topic_areas: [
                "IDENTITÀ PROFESSIONALE",
                "ESPERIENZA CHIAVE",
                "ABILITÀ UNICHE",
                "FALLIMENTO FORMATIVO",
                "DIMENSIONE PERSONALE",
                "VALORI & STILE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            greeting_prefix: "Ciao! Sono Vitae".to_string(),
            opening_message:
                "Ciao! Sono Vitae. Iniziamo dal tuo background. Di cosa ti occupi attualmente?"
                    .to_string(),
            closing_phrases: vec![
                "gemello digitale è pronto".to_string(),
                "abbiamo finito".to_string(),
            ],
            completion_turn_floor: 5,
            min_filled_ratio: 0.8,
            min_personal_interests: 1,
            require_formative_failure: true,
            max_tokens: 4096,
            fallback_message: "Scusa, non ho capito bene. Puoi raccontarmi qualcosa in più?"
                .to_string(),
            merge_policy: MergePolicy::Replace,
        }
    }
}

impl InterviewSpec {
    /// Four-area variant without the personal section.
    pub fn short_form() -> Self {
        Self {
            name: "short-form".to_string(),
            system_instruction: SHORT_FORM_INSTRUCTION.to_string(),
            topic_areas: [
                "IDENTITÀ PROFESSIONALE",
                "ESPERIENZA CHIAVE",
                "FALLIMENTO FORMATIVO",
                "VALORI & STILE",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_filled_ratio: 0.5,
            min_personal_interests: 0,
            max_tokens: 2048,
            ..Self::default()
        }
    }

    /// Load a script from a TOML file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> VitaeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> VitaeResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// True when `message` contains one of the closing phrases.
    pub fn mentions_closing_phrase(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.closing_phrases
            .iter()
            .any(|p| !p.trim().is_empty() && lower.contains(&p.to_lowercase()))
    }

    /// True when `content` is the UI's synthetic welcome.
    pub fn is_synthetic_welcome(&self, content: &str) -> bool {
        !self.greeting_prefix.is_empty() && content.trim_start().starts_with(&self.greeting_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_phrases_match_case_insensitively() {
        let spec = InterviewSpec::default();
        assert!(spec.mentions_closing_phrase("Perfetto, ABBIAMO FINITO!"));
        assert!(spec.mentions_closing_phrase("Il tuo Gemello Digitale è pronto"));
        assert!(!spec.mentions_closing_phrase("Passiamo alla prossima area"));
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let spec = InterviewSpec::from_toml_str(
            r#"
name = "english"
closing_phrases = ["twin is ready", "we are done"]
completion_turn_floor = 3
"#,
        )
        .unwrap();
        assert_eq!(spec.name, "english");
        assert_eq!(spec.completion_turn_floor, 3);
        assert!(spec.mentions_closing_phrase("Great, WE ARE DONE."));
        assert_eq!(spec.max_tokens, 4096);
        assert_eq!(spec.topic_areas.len(), 6);
    }

    #[test]
    fn short_form_has_four_areas() {
        let spec = InterviewSpec::short_form();
        assert_eq!(spec.topic_areas.len(), 4);
        assert_eq!(spec.greeting_prefix, InterviewSpec::default().greeting_prefix);
    }

    #[test]
    fn synthetic_welcome_detection() {
        let spec = InterviewSpec::default();
        assert!(spec.is_synthetic_welcome("Ciao! Sono Vitae, il tuo intervistatore."));
        assert!(!spec.is_synthetic_welcome("Ottimo, continuiamo."));
    }
}
