//! **Interview State Tracker**: folds each parsed reply into the running state.
//!
//! The server keeps no session: callers send back the last [`InterviewState`]
//! with the next turn and the tracker merges the new reply into it.

use serde::{Deserialize, Serialize};

use crate::completion;
use crate::extractor::ParsedReply;
use crate::profile::StructuredProfile;

/// How a payload that omits whole profile sections is merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The payload is the full cumulative profile; omitted sections become empty.
    #[default]
    Replace,
    /// Omitted sections keep their previous value.
    RetainOmittedSections,
}

/// Cumulative interview state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewState {
    pub progress: u8,
    pub current_area: String,
    pub questions_in_area: u32,
    /// Every area reported so far, in order, duplicates included.
    pub completed_topics: Vec<String>,
    /// Serialized as `null` until the model reports a profile.
    pub extracted_data: Option<StructuredProfile>,
    pub is_complete: bool,
}

impl InterviewState {
    /// Merge one reply. Consumes nothing from `reply` except what it reports.
    pub fn merge(&mut self, reply: &ParsedReply, policy: MergePolicy) {
        if let Some(payload) = &reply.extracted_data {
            let omitted = payload.omitted_sections();
            if !omitted.is_empty() {
                tracing::warn!(
                    omitted = ?omitted,
                    policy = ?policy,
                    "[VITAE] Model returned a partial profile"
                );
            }
            let payload = payload.clone();
            self.extracted_data = Some(match (policy, &self.extracted_data) {
                (MergePolicy::RetainOmittedSections, Some(previous)) => payload.overlay(previous),
                _ => payload.into_profile(),
            });
        }

        if let Some(area) = &reply.current_area {
            self.current_area = area.clone();
            self.completed_topics.push(area.clone());
        }
        if let Some(progress) = reply.progress {
            self.progress = progress.min(100);
        }
        if let Some(questions) = reply.questions_in_area {
            self.questions_in_area = questions;
        }
        self.is_complete = completion::decide(self.is_complete, reply);
        if self.is_complete && reply.forced_complete {
            self.progress = 100;
        }
    }

    /// Visited areas without duplicates, first-seen order.
    pub fn visited_areas(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for topic in &self.completed_topics {
            if !seen.iter().any(|s| s == topic) {
                seen.push(topic.clone());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfilePayload;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Option<ProfilePayload> {
        ProfilePayload::from_value(&value)
    }

    #[test]
    fn first_merge_without_data_is_explicit_null() {
        let mut state = InterviewState::default();
        state.merge(&ParsedReply::default(), MergePolicy::Replace);
        assert!(state.extracted_data.is_none());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["extracted_data"].is_null());
    }

    #[test]
    fn payload_replaces_snapshot_wholesale() {
        let mut state = InterviewState::default();
        state.merge(
            &ParsedReply {
                extracted_data: payload(json!({
                    "identity": {"role": "chef"},
                    "formative_failure": {"what": "burned the kitchen"}
                })),
                ..ParsedReply::default()
            },
            MergePolicy::Replace,
        );
        state.merge(
            &ParsedReply {
                extracted_data: payload(json!({"identity": {"role": "head chef"}})),
                ..ParsedReply::default()
            },
            MergePolicy::Replace,
        );
        let profile = state.extracted_data.as_ref().unwrap();
        assert_eq!(profile.identity.role, "head chef");
        assert!(profile.formative_failure.what.is_empty());
    }

    #[test]
    fn absent_payload_retains_snapshot() {
        let mut state = InterviewState::default();
        state.merge(
            &ParsedReply {
                extracted_data: payload(json!({"identity": {"role": "chef"}})),
                ..ParsedReply::default()
            },
            MergePolicy::Replace,
        );
        let before = state.extracted_data.clone();
        state.merge(&ParsedReply::default(), MergePolicy::Replace);
        assert_eq!(state.extracted_data, before);
    }

    #[test]
    fn retain_policy_keeps_omitted_sections() {
        let mut state = InterviewState::default();
        state.merge(
            &ParsedReply {
                extracted_data: payload(json!({
                    "identity": {"role": "chef"},
                    "formative_failure": {"what": "burned the kitchen"}
                })),
                ..ParsedReply::default()
            },
            MergePolicy::RetainOmittedSections,
        );
        state.merge(
            &ParsedReply {
                extracted_data: payload(json!({"identity": {"role": "head chef"}})),
                ..ParsedReply::default()
            },
            MergePolicy::RetainOmittedSections,
        );
        let profile = state.extracted_data.as_ref().unwrap();
        assert_eq!(profile.identity.role, "head chef");
        assert_eq!(profile.formative_failure.what, "burned the kitchen");
    }

    #[test]
    fn progress_and_area_are_held_when_absent() {
        let mut state = InterviewState::default();
        state.merge(
            &ParsedReply {
                progress: Some(30),
                current_area: Some("ESPERIENZA CHIAVE".into()),
                questions_in_area: Some(2),
                ..ParsedReply::default()
            },
            MergePolicy::Replace,
        );
        state.merge(&ParsedReply::default(), MergePolicy::Replace);
        assert_eq!(state.progress, 30);
        assert_eq!(state.current_area, "ESPERIENZA CHIAVE");
        assert_eq!(state.questions_in_area, 2);
    }

    #[test]
    fn topics_accumulate_and_dedup_on_view() {
        let mut state = InterviewState::default();
        for area in ["A", "A", "B"] {
            state.merge(
                &ParsedReply {
                    current_area: Some(area.into()),
                    ..ParsedReply::default()
                },
                MergePolicy::Replace,
            );
        }
        assert_eq!(state.completed_topics, vec!["A", "A", "B"]);
        assert_eq!(state.visited_areas(), vec!["A", "B"]);
    }

    #[test]
    fn completion_never_reverts() {
        let mut state = InterviewState::default();
        state.merge(
            &ParsedReply {
                is_complete: true,
                ..ParsedReply::default()
            },
            MergePolicy::Replace,
        );
        state.merge(&ParsedReply::default(), MergePolicy::Replace);
        assert!(state.is_complete);
    }
}
