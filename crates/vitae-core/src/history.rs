//! Conversation history filter: turns the caller-supplied history into the exact
//! turn list sent to the model.

use crate::interview::InterviewSpec;
use crate::turn::{Role, Turn};

/// What the engine should do with a filtered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPlan {
    /// Nothing to send: answer with the canned opening question.
    Opening,
    /// Send these turns to the model.
    Send(Vec<Turn>),
}

/// Drop the synthetic welcome and blank turns, then append the new utterance.
///
/// Model APIs reject empty content blocks, so a turn whose content is only
/// whitespace contributes nothing and is never sent.
///
/// Roles are already binary once deserialized into [`Turn`]; the coercion in
/// [`Role::coerce`] is what makes re-filtering stable.
pub fn filter_history(spec: &InterviewSpec, history: &[Turn], utterance: Option<&str>) -> Vec<Turn> {
    let first_assistant = history.iter().position(|t| t.role == Role::Assistant);
    let mut turns: Vec<Turn> = history
        .iter()
        .enumerate()
        .filter(|(idx, turn)| {
            !(Some(*idx) == first_assistant && spec.is_synthetic_welcome(&turn.content))
        })
        .filter(|(_, turn)| !turn.content.trim().is_empty())
        .map(|(_, turn)| turn.clone())
        .collect();

    if let Some(text) = utterance.map(str::trim).filter(|t| !t.is_empty()) {
        turns.push(Turn::user(text));
    }
    turns
}

/// [`filter_history`] plus the turn-0 short-circuit.
pub fn plan_turns(spec: &InterviewSpec, history: &[Turn], utterance: Option<&str>) -> HistoryPlan {
    let turns = filter_history(spec, history, utterance);
    if turns.is_empty() {
        HistoryPlan::Opening
    } else {
        HistoryPlan::Send(turns)
    }
}
