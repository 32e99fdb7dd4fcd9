//! Turn, tool-call, and reasoning-step records.
//!
//! A turn is one pass of the reasoning loop: exactly one model response
//! and its tool calls. Turns are inserted once, never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::AgentState;

/// What fed the turn its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// The wake-up prompt built at loop start.
    Wakeup,
    /// A heartbeat task queued a wake event.
    Heartbeat,
    /// A message from the creator address.
    Creator,
    /// A message from another agent.
    Agent,
    /// Anything else the runtime injected.
    System,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wakeup => "wakeup",
            Self::Heartbeat => "heartbeat",
            Self::Creator => "creator",
            Self::Agent => "agent",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

impl InputSource {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wakeup" => Some(Self::Wakeup),
            "heartbeat" => Some(Self::Heartbeat),
            "creator" => Some(Self::Creator),
            "agent" => Some(Self::Agent),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Token usage reported by a model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens in the completion.
    pub completion_tokens: u64,
    /// Sum of the two.
    pub total_tokens: u64,
}

/// Result of one tool invocation within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The call id assigned by the model response.
    pub id: String,
    /// Tool name as requested.
    pub name: String,
    /// The arguments the model supplied.
    pub args: serde_json::Value,
    /// Tool output, or a human-readable failure description.
    pub result: String,
    /// Wall-clock duration of the execution.
    pub duration_ms: u64,
    /// Set when the call failed; `result` still carries the user-visible text.
    pub error: Option<String>,
}

impl ToolCallResult {
    /// Build a failed result without running anything.
    pub fn failed(id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            id: id.into(),
            name: name.into(),
            args: serde_json::Value::Null,
            result: error.clone(),
            duration_ms: 0,
            error: Some(error),
        }
    }
}

/// One completed reasoning turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTurn {
    /// ULID.
    pub id: String,
    /// ISO-8601 insertion time.
    pub timestamp: String,
    /// Agent state when the turn ran.
    pub state: AgentState,
    /// The input content that triggered the turn, if any.
    pub input: Option<String>,
    /// Where the input came from.
    pub input_source: Option<InputSource>,
    /// The model's visible reasoning text.
    pub thinking: String,
    /// Tool calls executed during the turn, in dispatch order.
    pub tool_calls: Vec<ToolCallResult>,
    /// Token usage for the model call.
    pub token_usage: TokenUsage,
    /// Estimated cost of the turn in integer cents.
    pub cost_cents: i64,
}

/// Phase of the observe–orient–decide–act cycle a reasoning step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OodaPhase {
    /// Taking in state: balances, inbox, child health.
    Observe,
    /// Interpreting what was observed.
    Orient,
    /// Choosing a course of action.
    Decide,
    /// Committing to tool calls.
    Act,
}

impl fmt::Display for OodaPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Observe => "observe",
            Self::Orient => "orient",
            Self::Decide => "decide",
            Self::Act => "act",
        };
        f.write_str(s)
    }
}

impl OodaPhase {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "observe" => Some(Self::Observe),
            "orient" => Some(Self::Orient),
            "decide" => Some(Self::Decide),
            "act" => Some(Self::Act),
            _ => None,
        }
    }
}

/// An ordered slice of a turn's thinking, tagged with its OODA phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// ULID.
    pub id: String,
    /// The turn this step belongs to.
    pub turn_id: String,
    /// Position within the turn, starting at 0.
    pub step_number: u32,
    /// Phase tag.
    pub phase: OodaPhase,
    /// The step's text.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_mirrors_error_text() {
        let r = ToolCallResult::failed("call_1", "exec", "Unknown tool");
        assert_eq!(r.result, "Unknown tool");
        assert_eq!(r.error.as_deref(), Some("Unknown tool"));
        assert_eq!(r.duration_ms, 0);
    }

    #[test]
    fn input_source_round_trip() {
        for src in [
            InputSource::Wakeup,
            InputSource::Heartbeat,
            InputSource::Creator,
            InputSource::Agent,
            InputSource::System,
        ] {
            assert_eq!(InputSource::parse(&src.to_string()), Some(src));
        }
    }

    #[test]
    fn turn_serializes_with_snake_case_state() {
        let turn = AgentTurn {
            id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".into(),
            timestamp: "2026-01-15T09:30:00.000Z".into(),
            state: AgentState::Running,
            input: None,
            input_source: Some(InputSource::Heartbeat),
            thinking: String::new(),
            tool_calls: vec![],
            token_usage: TokenUsage::default(),
            cost_cents: 3,
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["input_source"], "heartbeat");
    }
}
