//! **Reply Extractor**: splits a raw model reply into the user-facing message and
//! the embedded structured payload.
//!
//! Models drift from the requested format: the payload may be fenced, surrounded
//! by prose, or cut off at the output-token bound. Extraction never fails; every
//! problem degrades to a text-only reply with a [`PayloadParseError`] attached.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::completion;
use crate::error::PayloadParseError;
use crate::interview::InterviewSpec;
use crate::profile::ProfilePayload;

/// Progress reported when the reply carried no payload at all.
pub const UNKNOWN_PROGRESS: u8 = 50;

/// Text outside the payload must be longer than this to win over the payload message.
const PROSE_MIN_CHARS: usize = 5;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?([\s\S]*?)\s*```").expect("valid fence regex")
});

static FENCE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?").expect("valid fence marker regex"));

static OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?").expect("valid open fence regex"));

static MESSAGE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""message"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid message field regex")
});

/// One model reply, parsed. Transient: the tracker folds it into [`crate::InterviewState`].
#[derive(Debug, Clone, Default)]
pub struct ParsedReply {
    /// Never empty.
    pub message: String,
    pub progress: Option<u8>,
    pub current_area: Option<String>,
    pub questions_in_area: Option<u32>,
    pub extracted_data: Option<ProfilePayload>,
    pub is_complete: bool,
    /// Set when the safety valve overrode the payload.
    pub forced_complete: bool,
    pub parse_error: Option<PayloadParseError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateKind {
    Fenced,
    Braces,
}

#[derive(Debug)]
struct Candidate<'a> {
    kind: CandidateKind,
    /// Payload text handed to the JSON parser.
    payload: &'a str,
    /// Byte span of the whole match inside the raw text.
    start: usize,
    end: usize,
}

fn fenced_candidate(raw: &str) -> Option<Candidate<'_>> {
    let caps = FENCED_BLOCK.captures(raw)?;
    let whole = caps.get(0)?;
    let inner = caps.get(1)?;
    Some(Candidate {
        kind: CandidateKind::Fenced,
        payload: inner.as_str(),
        start: whole.start(),
        end: whole.end(),
    })
}

/// First `{` to last `}` inside `raw[from..to]`.
fn brace_candidate(raw: &str, from: usize, to: usize) -> Option<Candidate<'_>> {
    let region = &raw[from..to];
    let start = region.find('{')?;
    let end = region.rfind('}')?;
    if start > end {
        return None;
    }
    Some(Candidate {
        kind: CandidateKind::Braces,
        payload: &region[start..=end],
        start: from + start,
        end: from + end + 1,
    })
}

/// A payload opened after `from` and never closed: output cut at the token bound.
fn unterminated_candidate(raw: &str, from: usize) -> Option<Candidate<'_>> {
    let brace = raw[from..].find('{').map(|i| from + i);
    let fence = OPEN_FENCE.find_at(raw, from);
    let start = match (fence, brace) {
        (Some(f), Some(b)) => f.start().min(b),
        (Some(f), None) => f.start(),
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let payload_start = match (brace, fence) {
        (Some(b), _) => b,
        (None, Some(f)) => f.end(),
        (None, None) => start,
    };
    Some(Candidate {
        kind: CandidateKind::Braces,
        payload: &raw[payload_start..],
        start,
        end: raw.len(),
    })
}

/// Payload candidates in the order they are tried. A fenced block that does not
/// hold an object gives way to a brace span outside it.
fn find_candidates(raw: &str) -> Vec<Candidate<'_>> {
    let mut candidates = Vec::new();
    match fenced_candidate(raw) {
        Some(fenced) => {
            let (start, end) = (fenced.start, fenced.end);
            candidates.push(fenced);
            candidates.extend(brace_candidate(raw, end, raw.len()));
            candidates.extend(brace_candidate(raw, 0, start));
            if candidates.len() == 1 {
                candidates.extend(unterminated_candidate(raw, end));
            }
        }
        None => {
            candidates.extend(
                brace_candidate(raw, 0, raw.len()).or_else(|| unterminated_candidate(raw, 0)),
            );
        }
    }
    candidates
}

fn clean_prose(text: &str) -> String {
    FENCE_MARKER.replace_all(text, "").trim().to_string()
}

fn join_prose(before: &str, after: &str) -> String {
    let before = clean_prose(before);
    let after = clean_prose(after);
    match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{}\n\n{}", before, after),
        (false, true) => before,
        (true, false) => after,
        (true, true) => String::new(),
    }
}

/// Salvage the `"message"` string from a payload that failed to parse.
fn salvage_message(payload: &str) -> Option<String> {
    let caps = MESSAGE_FIELD.captures(payload)?;
    let escaped = caps.get(1)?.as_str();
    let decoded = serde_json::from_str::<String>(&format!("\"{}\"", escaped))
        .unwrap_or_else(|_| escaped.to_string());
    let decoded = decoded.trim().to_string();
    (!decoded.is_empty()).then_some(decoded)
}

/// Degraded progress estimate from conversation length.
pub fn heuristic_progress(prior_turns: usize) -> u8 {
    if prior_turns == 0 {
        10
    } else {
        (prior_turns.saturating_mul(5)).min(95) as u8
    }
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn resolve_message(prose: String, payload_message: Option<String>, spec: &InterviewSpec) -> String {
    if prose.chars().count() > PROSE_MIN_CHARS {
        return prose;
    }
    payload_message
        .or_else(|| (!prose.is_empty()).then_some(prose))
        .unwrap_or_else(|| spec.fallback_message.clone())
}

fn from_object(obj: &Map<String, Value>, prose: String, spec: &InterviewSpec) -> ParsedReply {
    let message = resolve_message(prose, text(obj.get("message")), spec);
    ParsedReply {
        message,
        progress: numeric(obj.get("progress")).map(|p| p.round().clamp(0.0, 100.0) as u8),
        current_area: text(obj.get("current_area")),
        questions_in_area: numeric(obj.get("questions_in_area"))
            .filter(|q| *q >= 0.0)
            .map(|q| q.round() as u32),
        extracted_data: obj
            .get("extracted_data")
            .and_then(ProfilePayload::from_value),
        is_complete: flag(obj.get("is_complete")),
        forced_complete: false,
        parse_error: None,
    }
}

/// Parse a raw completion.
///
/// `prior_turns` is the length of the caller-supplied history before the new
/// utterance; it drives the heuristic progress and the safety-valve floor.
pub fn extract_reply(raw: &str, prior_turns: usize, spec: &InterviewSpec) -> ParsedReply {
    let candidates = find_candidates(raw);
    let parsed = candidates.iter().find_map(|c| match serde_json::from_str::<Value>(c.payload) {
        Ok(Value::Object(obj)) => Some((c, obj)),
        _ => None,
    });

    let mut reply = match (parsed, candidates.first()) {
        (Some((c, obj)), _) => from_object(&obj, join_prose(&raw[..c.start], &raw[c.end..]), spec),
        (None, Some(candidate)) => {
            let before = &raw[..candidate.start];
            let after = &raw[candidate.end..];
            match serde_json::from_str::<Value>(candidate.payload) {
                Ok(other) => degraded(
                    raw,
                    join_prose(before, after),
                    None,
                    prior_turns,
                    PayloadParseError::Malformed(format!("payload is not an object: {}", kind_of(&other))),
                    spec,
                ),
                Err(e) => {
                    // A brace span that fails to parse is usually truncated output: whatever
                    // follows it is payload debris, not prose.
                    let prose = match candidate.kind {
                        CandidateKind::Fenced => join_prose(before, after),
                        CandidateKind::Braces => clean_prose(before),
                    };
                    degraded(
                        raw,
                        prose,
                        salvage_message(candidate.payload),
                        prior_turns,
                        PayloadParseError::Malformed(e.to_string()),
                        spec,
                    )
                }
            }
        }
        (None, None) => {
            let message = raw.trim();
            ParsedReply {
                message: if message.is_empty() {
                    spec.fallback_message.clone()
                } else {
                    message.to_string()
                },
                progress: Some(UNKNOWN_PROGRESS),
                parse_error: Some(PayloadParseError::Missing),
                ..ParsedReply::default()
            }
        }
    };

    if let Some(err) = &reply.parse_error {
        tracing::warn!(error = %err, prior_turns, "[VITAE] Reply payload degraded to text-only");
    }

    completion::apply_safety_valve(&mut reply, prior_turns, spec);
    reply
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn degraded(
    raw: &str,
    prose: String,
    salvaged: Option<String>,
    prior_turns: usize,
    error: PayloadParseError,
    spec: &InterviewSpec,
) -> ParsedReply {
    let message = if !prose.is_empty() {
        prose
    } else if let Some(m) = salvaged {
        m
    } else if !raw.trim().is_empty() {
        raw.trim().to_string()
    } else {
        spec.fallback_message.clone()
    };
    ParsedReply {
        message,
        progress: Some(heuristic_progress(prior_turns)),
        parse_error: Some(error),
        ..ParsedReply::default()
    }
}
