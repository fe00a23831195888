//! Portfolio records: the finalized twin as persisted and served.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{VitaeError, VitaeResult};
use crate::store::PortfolioStore;
use crate::turn::Turn;

/// Stored when the caller supplies no voice; resolved to the stock speech voice at playback.
pub const DEFAULT_VOICE_SENTINEL: &str = "default";

/// Persisted twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default, rename = "jobTitle", skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socials: Option<serde_json::Value>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub voice_id: String,
    pub system_prompt: String,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

/// Public view: no system prompt, no transcript.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub slug: String,
    pub name: String,
    #[serde(rename = "jobTitle", skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socials: Option<serde_json::Value>,
    pub traits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub voice_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&PortfolioRecord> for PortfolioSummary {
    fn from(r: &PortfolioRecord) -> Self {
        Self {
            slug: r.slug.clone(),
            name: r.name.clone(),
            job_title: r.job_title.clone(),
            city: r.city.clone(),
            socials: r.socials.clone(),
            traits: r.traits.clone(),
            photo_url: r.photo_url.clone(),
            voice_id: r.voice_id.clone(),
            created_at: r.created_at,
        }
    }
}

/// Finalization request from the onboarding flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPortfolio {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "jobTitle")]
    pub job_title: Option<String>,
    #[serde(default, rename = "birthDate")]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub socials: Option<serde_json::Value>,
    #[serde(default)]
    pub traits: Option<Vec<String>>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub history: Vec<Turn>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl NewPortfolio {
    /// Build the record. The id doubles as the slug so homonyms never collide.
    pub fn into_record(self) -> VitaeResult<PortfolioRecord> {
        if self.system_prompt.trim().is_empty() {
            return Err(VitaeError::InvalidInput("system_prompt is required".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        Ok(PortfolioRecord {
            slug: id.clone(),
            id,
            name: self.name.trim().to_string(),
            job_title: non_blank(self.job_title),
            birth_date: non_blank(self.birth_date),
            city: non_blank(self.city),
            socials: self.socials,
            traits: self.traits.unwrap_or_default(),
            photo_url: non_blank(self.photo_url),
            voice_id: non_blank(self.voice_id).unwrap_or_else(|| DEFAULT_VOICE_SENTINEL.to_string()),
            system_prompt: self.system_prompt,
            conversation_history: self.history,
            created_at: Utc::now(),
        })
    }
}

/// Build and persist a new portfolio; returns the stored record.
pub async fn create_portfolio(
    store: &PortfolioStore,
    request: NewPortfolio,
) -> VitaeResult<PortfolioRecord> {
    let record = request.into_record()?;
    store.save_portfolio(&record).await?;
    tracing::info!(slug = %record.slug, name = %record.name, "[VITAE] Portfolio created");
    Ok(record)
}

/// Fetch a portfolio or fail with `NotFound`.
pub fn require_portfolio(store: &PortfolioStore, slug: &str) -> VitaeResult<PortfolioRecord> {
    store
        .get_portfolio(slug)?
        .ok_or_else(|| VitaeError::NotFound(format!("portfolio {}", slug)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewPortfolio {
        NewPortfolio {
            name: " Giulia ".into(),
            job_title: Some("UX designer".into()),
            city: Some("  ".into()),
            system_prompt: "Sei Giulia.".into(),
            history: vec![Turn::user("ciao")],
            ..NewPortfolio::default()
        }
    }

    #[test]
    fn record_defaults() {
        let record = request().into_record().unwrap();
        assert_eq!(record.id, record.slug);
        assert_eq!(record.name, "Giulia");
        assert_eq!(record.voice_id, DEFAULT_VOICE_SENTINEL);
        assert!(record.traits.is_empty());
        assert!(record.city.is_none());
        assert!(Uuid::parse_str(&record.slug).is_ok());
    }

    #[test]
    fn missing_system_prompt_is_invalid() {
        let req = NewPortfolio {
            system_prompt: " ".into(),
            ..request()
        };
        assert!(matches!(req.into_record(), Err(VitaeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn create_then_require() {
        let dir = tempfile::tempdir().unwrap();
        let store = PortfolioStore::open(Some(dir.path())).unwrap();
        let record = create_portfolio(&store, request()).await.unwrap();
        let loaded = require_portfolio(&store, &record.slug).unwrap();
        assert_eq!(loaded, record);
        assert!(matches!(
            require_portfolio(&store, "missing"),
            Err(VitaeError::NotFound(_))
        ));
    }

    #[test]
    fn serialized_keys_match_wire_names() {
        let record = request().into_record().unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["jobTitle"], "UX designer");
        assert!(json.get("birthDate").is_none());
        assert!(json["created_at"].is_string());
    }
}
