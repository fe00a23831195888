//! **StructuredProfile**: the fixed-shape facts record extracted during the interview.
//!
//! The model returns `extracted_data` as loosely-typed JSON. Ingest is lenient:
//! unknown keys are ignored and a field of the wrong JSON type falls back to its
//! default instead of rejecting the whole payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Section names, in interview order.
pub const PROFILE_SECTIONS: [&str; 7] = [
    "identity",
    "key_project",
    "unique_abilities",
    "formative_failure",
    "personal_dimension",
    "values_and_style",
    "communication_style",
];

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    #[serde(deserialize_with = "lenient_text")]
    pub role: String,
    #[serde(deserialize_with = "lenient_number")]
    pub experience_years: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub passion: String,
    #[serde(deserialize_with = "lenient_text")]
    pub current_focus: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyProject {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub context: String,
    #[serde(deserialize_with = "lenient_text")]
    pub challenge: String,
    #[serde(deserialize_with = "lenient_text")]
    pub approach: String,
    #[serde(deserialize_with = "lenient_text")]
    pub pride_point: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueAbilities {
    #[serde(deserialize_with = "lenient_text")]
    pub exceptional_at: String,
    #[serde(deserialize_with = "lenient_text")]
    pub differentiator: String,
    #[serde(deserialize_with = "lenient_text")]
    pub main_anti_skill: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormativeFailure {
    #[serde(deserialize_with = "lenient_text")]
    pub what: String,
    #[serde(deserialize_with = "lenient_text")]
    pub why: String,
    #[serde(deserialize_with = "lenient_text")]
    pub lesson: String,
    #[serde(deserialize_with = "lenient_text")]
    pub current_application: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalDimension {
    #[serde(deserialize_with = "lenient_list")]
    pub passions: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub significant_travels: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub current_learning: String,
    #[serde(deserialize_with = "lenient_list")]
    pub hobbies: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub connection_to_work: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuesAndStyle {
    #[serde(deserialize_with = "lenient_text")]
    pub ideal_team: String,
    #[serde(deserialize_with = "lenient_text")]
    pub work_style: String,
    #[serde(deserialize_with = "lenient_text")]
    pub motivates: String,
    #[serde(deserialize_with = "lenient_text")]
    pub demotivates: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationStyle {
    #[serde(deserialize_with = "lenient_text")]
    pub tone: String,
    #[serde(deserialize_with = "lenient_text")]
    pub language: String,
}

/// Cumulative profile snapshot. Every section is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredProfile {
    pub identity: Identity,
    pub key_project: KeyProject,
    pub unique_abilities: UniqueAbilities,
    pub formative_failure: FormativeFailure,
    pub personal_dimension: PersonalDimension,
    pub values_and_style: ValuesAndStyle,
    pub communication_style: CommunicationStyle,
}

fn text_filled(s: &str) -> bool {
    !s.trim().is_empty()
}

impl StructuredProfile {
    /// `(filled, total)` over every leaf field.
    pub fn field_counts(&self) -> (usize, usize) {
        let i = &self.identity;
        let k = &self.key_project;
        let u = &self.unique_abilities;
        let f = &self.formative_failure;
        let p = &self.personal_dimension;
        let v = &self.values_and_style;
        let c = &self.communication_style;
        let flags = [
            text_filled(&i.role),
            i.experience_years.is_some(),
            text_filled(&i.passion),
            text_filled(&i.current_focus),
            text_filled(&k.name),
            text_filled(&k.context),
            text_filled(&k.challenge),
            text_filled(&k.approach),
            text_filled(&k.pride_point),
            text_filled(&u.exceptional_at),
            text_filled(&u.differentiator),
            text_filled(&u.main_anti_skill),
            text_filled(&f.what),
            text_filled(&f.why),
            text_filled(&f.lesson),
            text_filled(&f.current_application),
            !p.passions.is_empty(),
            !p.significant_travels.is_empty(),
            text_filled(&p.current_learning),
            !p.hobbies.is_empty(),
            text_filled(&p.connection_to_work),
            text_filled(&v.ideal_team),
            text_filled(&v.work_style),
            text_filled(&v.motivates),
            text_filled(&v.demotivates),
            text_filled(&c.tone),
            text_filled(&c.language),
        ];
        (flags.iter().filter(|b| **b).count(), flags.len())
    }

    /// Share of leaf fields that carry a value, 0.0–1.0.
    pub fn filled_ratio(&self) -> f32 {
        let (filled, total) = self.field_counts();
        filled as f32 / total as f32
    }

    pub fn has_formative_failure(&self) -> bool {
        text_filled(&self.formative_failure.what)
    }

    /// Passions plus hobbies.
    pub fn personal_interest_count(&self) -> usize {
        self.personal_dimension.passions.len() + self.personal_dimension.hobbies.len()
    }
}

/// The profile as reported by one model reply: each section may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePayload {
    pub identity: Option<Identity>,
    pub key_project: Option<KeyProject>,
    pub unique_abilities: Option<UniqueAbilities>,
    pub formative_failure: Option<FormativeFailure>,
    pub personal_dimension: Option<PersonalDimension>,
    pub values_and_style: Option<ValuesAndStyle>,
    pub communication_style: Option<CommunicationStyle>,
}

impl ProfilePayload {
    /// Read a payload from arbitrary JSON. Non-object values and sections of the
    /// wrong shape are treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        fn section<T: serde::de::DeserializeOwned>(
            obj: &serde_json::Map<String, Value>,
            key: &str,
        ) -> Option<T> {
            obj.get(key)
                .filter(|v| v.is_object())
                .and_then(|v| serde_json::from_value(v.clone()).ok())
        }
        Some(Self {
            identity: section(obj, "identity"),
            key_project: section(obj, "key_project"),
            unique_abilities: section(obj, "unique_abilities"),
            formative_failure: section(obj, "formative_failure"),
            personal_dimension: section(obj, "personal_dimension"),
            values_and_style: section(obj, "values_and_style"),
            communication_style: section(obj, "communication_style"),
        })
    }

    /// Names of the sections this payload left out.
    pub fn omitted_sections(&self) -> Vec<&'static str> {
        let present = [
            self.identity.is_some(),
            self.key_project.is_some(),
            self.unique_abilities.is_some(),
            self.formative_failure.is_some(),
            self.personal_dimension.is_some(),
            self.values_and_style.is_some(),
            self.communication_style.is_some(),
        ];
        PROFILE_SECTIONS
            .iter()
            .zip(present)
            .filter(|(_, p)| !p)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Full snapshot, omitted sections empty.
    pub fn into_profile(self) -> StructuredProfile {
        StructuredProfile {
            identity: self.identity.unwrap_or_default(),
            key_project: self.key_project.unwrap_or_default(),
            unique_abilities: self.unique_abilities.unwrap_or_default(),
            formative_failure: self.formative_failure.unwrap_or_default(),
            personal_dimension: self.personal_dimension.unwrap_or_default(),
            values_and_style: self.values_and_style.unwrap_or_default(),
            communication_style: self.communication_style.unwrap_or_default(),
        }
    }

    /// Full snapshot, omitted sections taken from `previous`.
    pub fn overlay(self, previous: &StructuredProfile) -> StructuredProfile {
        StructuredProfile {
            identity: self.identity.unwrap_or_else(|| previous.identity.clone()),
            key_project: self.key_project.unwrap_or_else(|| previous.key_project.clone()),
            unique_abilities: self
                .unique_abilities
                .unwrap_or_else(|| previous.unique_abilities.clone()),
            formative_failure: self
                .formative_failure
                .unwrap_or_else(|| previous.formative_failure.clone()),
            personal_dimension: self
                .personal_dimension
                .unwrap_or_else(|| previous.personal_dimension.clone()),
            values_and_style: self
                .values_and_style
                .unwrap_or_else(|| previous.values_and_style.clone()),
            communication_style: self
                .communication_style
                .unwrap_or_else(|| previous.communication_style.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_fields_absorb_type_drift() {
        let payload = ProfilePayload::from_value(&json!({
            "identity": {"role": "Backend engineer", "experience_years": "12", "passion": 42},
            "personal_dimension": {"passions": ["hiking", "", 3], "hobbies": "chess"},
            "unknown_section": {"x": 1}
        }))
        .unwrap();
        let profile = payload.into_profile();
        assert_eq!(profile.identity.role, "Backend engineer");
        assert_eq!(profile.identity.experience_years, Some(12.0));
        assert_eq!(profile.identity.passion, "42");
        assert_eq!(profile.personal_dimension.passions, vec!["hiking", "3"]);
        assert_eq!(profile.personal_dimension.hobbies, vec!["chess"]);
    }

    #[test]
    fn null_fields_default() {
        let payload = ProfilePayload::from_value(&json!({
            "identity": {"role": null, "experience_years": null}
        }))
        .unwrap();
        let identity = payload.identity.unwrap();
        assert!(identity.role.is_empty());
        assert!(identity.experience_years.is_none());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(ProfilePayload::from_value(&json!("nope")).is_none());
        assert!(ProfilePayload::from_value(&json!(null)).is_none());
    }

    #[test]
    fn omitted_sections_are_reported() {
        let payload = ProfilePayload::from_value(&json!({
            "identity": {}, "key_project": "garbage"
        }))
        .unwrap();
        let omitted = payload.omitted_sections();
        assert!(!omitted.contains(&"identity"));
        assert!(omitted.contains(&"key_project"));
        assert_eq!(omitted.len(), 6);
    }

    #[test]
    fn overlay_keeps_previous_sections() {
        let mut previous = StructuredProfile::default();
        previous.formative_failure.what = "Missed a launch".into();
        let payload = ProfilePayload::from_value(&json!({
            "identity": {"role": "PM"}
        }))
        .unwrap();
        let merged = payload.overlay(&previous);
        assert_eq!(merged.identity.role, "PM");
        assert_eq!(merged.formative_failure.what, "Missed a launch");
    }

    #[test]
    fn completeness_metrics() {
        let mut profile = StructuredProfile::default();
        assert_eq!(profile.field_counts().0, 0);
        assert!(!profile.has_formative_failure());
        profile.formative_failure.what = "Shipped too early".into();
        profile.personal_dimension.hobbies.push("climbing".into());
        assert!(profile.has_formative_failure());
        assert_eq!(profile.personal_interest_count(), 1);
        assert_eq!(profile.field_counts(), (2, 27));
    }
}
