//! **InterviewEngine**: one stateless interview step.
//!
//! filter history → (turn 0: canned opening) → model → extract → completion → merge.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::completion::CriteriaReport;
use crate::error::{PayloadParseError, VitaeResult};
use crate::extractor::extract_reply;
use crate::history::{plan_turns, HistoryPlan};
use crate::interview::InterviewSpec;
use crate::model::TextGenerator;
use crate::profile::StructuredProfile;
use crate::tracker::InterviewState;
use crate::turn::Turn;

/// Turn submission from the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    /// New user utterance, if any.
    #[serde(default, alias = "message")]
    pub utterance: Option<String>,
    #[serde(default)]
    pub history: Vec<Turn>,
    /// State returned by the previous turn; fresh when absent.
    #[serde(default)]
    pub state: Option<InterviewState>,
}

/// Result of one interview step.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub message: String,
    pub progress: u8,
    pub current_area: String,
    pub questions_in_area: u32,
    pub completed_topics: Vec<String>,
    pub extracted_data: Option<StructuredProfile>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<PayloadParseError>,
    /// Cumulative state to send back with the next turn.
    pub state: InterviewState,
}

impl TurnResponse {
    fn new(message: String, state: InterviewState, parse_error: Option<PayloadParseError>) -> Self {
        Self {
            message,
            progress: state.progress,
            current_area: state.current_area.clone(),
            questions_in_area: state.questions_in_area,
            completed_topics: state.completed_topics.clone(),
            extracted_data: state.extracted_data.clone(),
            is_complete: state.is_complete,
            parse_error,
            state,
        }
    }
}

/// Drives the interview against a text generator.
pub struct InterviewEngine {
    spec: Arc<InterviewSpec>,
    generator: Arc<dyn TextGenerator>,
}

impl InterviewEngine {
    pub fn new(spec: InterviewSpec, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            spec: Arc::new(spec),
            generator,
        }
    }

    pub fn spec(&self) -> &InterviewSpec {
        &self.spec
    }

    /// Run one interview step. Only a generator failure is an error.
    pub async fn submit_turn(&self, request: TurnRequest) -> VitaeResult<TurnResponse> {
        let prior_turns = request.history.len();
        let mut state = request.state.unwrap_or_default();

        let turns = match plan_turns(&self.spec, &request.history, request.utterance.as_deref()) {
            HistoryPlan::Opening => {
                tracing::debug!(spec = %self.spec.name, "[VITAE] Turn 0: canned opening");
                state.progress = 0;
                return Ok(TurnResponse::new(self.spec.opening_message.clone(), state, None));
            }
            HistoryPlan::Send(turns) => turns,
        };

        if state.is_complete {
            tracing::warn!(prior_turns, "[VITAE] Turn submitted after completion");
        }

        let raw = self
            .generator
            .generate(&self.spec.system_instruction, &turns, self.spec.max_tokens)
            .await?;

        let reply = extract_reply(&raw, prior_turns, &self.spec);
        let model_flag = reply.is_complete && !reply.forced_complete;
        state.merge(&reply, self.spec.merge_policy);

        if model_flag {
            let report = CriteriaReport::evaluate(
                &self.spec,
                state.extracted_data.as_ref(),
                &state.visited_areas(),
            );
            if !report.satisfied(&self.spec) {
                tracing::warn!(report = ?report, "[VITAE] Model marked interview complete before criteria were met");
            }
        }

        tracing::info!(
            spec = %self.spec.name,
            prior_turns,
            progress = state.progress,
            area = %state.current_area,
            complete = state.is_complete,
            "[VITAE] Interview turn processed"
        );

        Ok(TurnResponse::new(reply.message, state, reply.parse_error))
    }
}
