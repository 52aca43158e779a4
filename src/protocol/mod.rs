// src/protocol/mod.rs

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Action name the model uses to hand back its answer instead of a tool call.
pub const FINAL_ANSWER: &str = "Final Answer";

/// First fence to the last one, so fences nested inside string values stay put.
static FENCED_OUTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*)```").expect("fence regex"));
static FENCED_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence regex"));
static BARE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("object regex"));

/// One parsed turn of the model inside the agent loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentStep {
    Action { tool: String, input: String },
    Finish(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON action found in model output")]
    NoJson,
    #[error("model output is not a valid action: {0}")]
    Invalid(String),
}

#[derive(Deserialize)]
struct RawAction {
    action: String,
    #[serde(default)]
    action_input: Value,
}

/// Parses the model's reply into an `AgentStep`.
///
/// Candidates are tried in order: everything between the first and last
/// fence, the first fenced block, then a bare JSON object embedded in prose.
/// The first one that deserializes wins. A non-string `action_input` is kept
/// as its JSON text.
pub fn parse_step(raw: &str) -> Result<AgentStep, ParseError> {
    let candidates = [&*FENCED_OUTER, &*FENCED_FIRST]
        .into_iter()
        .filter_map(|re| re.captures(raw).and_then(|cap| cap.get(1)))
        .map(|m| m.as_str())
        .chain(BARE_OBJECT.find(raw).map(|m| m.as_str()));

    let mut last_error = ParseError::NoJson;
    for candidate in candidates {
        match serde_json::from_str::<RawAction>(candidate.trim()) {
            Ok(parsed) => return Ok(into_step(parsed)),
            Err(e) => last_error = ParseError::Invalid(e.to_string()),
        }
    }
    Err(last_error)
}

fn into_step(parsed: RawAction) -> AgentStep {
    let input = match parsed.action_input {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    };

    if parsed.action.trim() == FINAL_ANSWER {
        AgentStep::Finish(input)
    } else {
        AgentStep::Action {
            tool: parsed.action.trim().to_string(),
            input,
        }
    }
}
