//! Conversation turns exchanged between the caller and the model.

use serde::{Deserialize, Deserializer, Serialize};

/// Binary role system: anything that is not the assistant is the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

impl Role {
    /// Coerce a free-form role label. Only `"assistant"` maps to [`Role::Assistant`].
    pub fn coerce(label: &str) -> Self {
        if label == "assistant" {
            Role::Assistant
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(Role::coerce(label.as_deref().unwrap_or_default()))
    }
}

/// Deserialize a string field that clients may send as `null`.
pub fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One message in the interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_become_user() {
        let turns: Vec<Turn> = serde_json::from_str(
            r#"[{"role":"system","content":"a"},{"role":"assistant","content":"b"},{"content":"c","role":null}]"#,
        )
        .unwrap();
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].role, Role::User);
    }

    #[test]
    fn missing_content_defaults_to_empty() {
        let turn: Turn = serde_json::from_str(r#"{"role":"user"}"#).unwrap();
        assert!(turn.content.is_empty());
    }

    #[test]
    fn null_content_and_missing_role_are_tolerated() {
        let turns: Vec<Turn> = serde_json::from_str(
            r#"[{"role":"user","content":null},{"content":"solo testo"}]"#,
        )
        .unwrap();
        assert_eq!(turns[0], Turn::user(""));
        assert_eq!(turns[1], Turn::user("solo testo"));
    }
}
