//! **Completion Policy**: decides whether the interview is over.
//!
//! | previous complete | payload flag | closing phrase AND prior turns > floor | result |
//! |---|---|---|---|
//! | true  | any   | any   | true  |
//! | false | true  | any   | true  |
//! | false | false | true  | true (forced, progress 100) |
//! | false | false | false | false |
//!
//! The phrase check is a heuristic tied to the script's language; it can only
//! force completion, never revoke it.

use serde::Serialize;

use crate::extractor::ParsedReply;
use crate::interview::InterviewSpec;
use crate::profile::StructuredProfile;

/// Textual safety valve, applied to every parsed reply.
pub fn apply_safety_valve(reply: &mut ParsedReply, prior_turns: usize, spec: &InterviewSpec) {
    if prior_turns > spec.completion_turn_floor && spec.mentions_closing_phrase(&reply.message) {
        if !reply.is_complete {
            tracing::info!(prior_turns, "[VITAE] Closing phrase detected; forcing completion");
        }
        reply.is_complete = true;
        reply.forced_complete = true;
        reply.progress = Some(100);
    }
}

/// Final decision for this turn. Monotonic in `previously_complete`.
pub fn decide(previously_complete: bool, reply: &ParsedReply) -> bool {
    previously_complete || reply.is_complete
}

/// How the documented completion criteria stand for a profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaReport {
    pub areas_visited: usize,
    pub areas_total: usize,
    pub filled_ratio: f32,
    pub has_formative_failure: bool,
    pub personal_interests: usize,
}

impl CriteriaReport {
    pub fn evaluate(
        spec: &InterviewSpec,
        profile: Option<&StructuredProfile>,
        visited_areas: &[String],
    ) -> Self {
        let areas_visited = spec
            .topic_areas
            .iter()
            .filter(|area| visited_areas.iter().any(|v| v.eq_ignore_ascii_case(area)))
            .count();
        let empty = StructuredProfile::default();
        let profile = profile.unwrap_or(&empty);
        Self {
            areas_visited,
            areas_total: spec.topic_areas.len(),
            filled_ratio: profile.filled_ratio(),
            has_formative_failure: profile.has_formative_failure(),
            personal_interests: profile.personal_interest_count(),
        }
    }

    /// True when every criterion in `spec` holds.
    pub fn satisfied(&self, spec: &InterviewSpec) -> bool {
        self.areas_visited >= self.areas_total
            && self.filled_ratio >= spec.min_filled_ratio
            && (!spec.require_formative_failure || self.has_formative_failure)
            && self.personal_interests >= spec.min_personal_interests
    }
}
