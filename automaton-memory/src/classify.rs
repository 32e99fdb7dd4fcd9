//! Turn classification from tool names and outcomes.

use automaton_core::AgentTurn;
use automaton_core::memory::TurnActivity;

const STRATEGIC_TOOLS: &[&str] = &[
    "spawn_child",
    "fund_child",
    "start_child",
    "transfer_credits",
    "switch_model",
];

const COMMUNICATION_TOOLS: &[&str] = &[
    "send_message",
    "check_inbox",
    "leave_feedback",
    "discover_agent",
];

const PRODUCTIVE_TOOLS: &[&str] = &[
    "exec",
    "write_file",
    "expose_port",
    "create_sandbox",
    "web_fetch",
    "x402_fetch",
];

/// Classify a completed turn. Error wins when most calls failed;
/// otherwise the most consequential tool family present decides.
pub fn classify_turn(turn: &AgentTurn) -> TurnActivity {
    if turn.tool_calls.is_empty() {
        return TurnActivity::Idle;
    }

    let failed = turn.tool_calls.iter().filter(|c| c.error.is_some()).count();
    if failed * 2 > turn.tool_calls.len() {
        return TurnActivity::Error;
    }

    let used =
        |names: &[&str]| turn.tool_calls.iter().any(|c| names.contains(&c.name.as_str()));

    if used(STRATEGIC_TOOLS) {
        TurnActivity::Strategic
    } else if used(PRODUCTIVE_TOOLS) {
        TurnActivity::Productive
    } else if used(COMMUNICATION_TOOLS) {
        TurnActivity::Communication
    } else {
        TurnActivity::Maintenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::{AgentState, TokenUsage, ToolCallResult};

    fn turn_with(calls: &[(&str, bool)]) -> AgentTurn {
        AgentTurn {
            id: "T".into(),
            timestamp: automaton_core::id::now_iso(),
            state: AgentState::Running,
            input: None,
            input_source: None,
            thinking: String::new(),
            tool_calls: calls
                .iter()
                .enumerate()
                .map(|(i, (name, ok))| ToolCallResult {
                    id: format!("c{i}"),
                    name: name.to_string(),
                    args: serde_json::Value::Null,
                    result: String::new(),
                    duration_ms: 1,
                    error: (!ok).then(|| "failed".to_string()),
                })
                .collect(),
            token_usage: TokenUsage::default(),
            cost_cents: 0,
        }
    }

    #[test]
    fn no_calls_is_idle() {
        assert_eq!(classify_turn(&turn_with(&[])), TurnActivity::Idle);
    }

    #[test]
    fn mostly_failed_is_error() {
        let turn = turn_with(&[("exec", false), ("exec", false), ("check_credits", true)]);
        assert_eq!(classify_turn(&turn), TurnActivity::Error);
    }

    #[test]
    fn strategic_outranks_productive() {
        let turn = turn_with(&[("exec", true), ("spawn_child", true)]);
        assert_eq!(classify_turn(&turn), TurnActivity::Strategic);
    }

    #[test]
    fn balance_checks_are_maintenance() {
        let turn = turn_with(&[("check_credits", true)]);
        assert_eq!(classify_turn(&turn), TurnActivity::Maintenance);
    }

    #[test]
    fn messaging_is_communication() {
        let turn = turn_with(&[("send_message", true)]);
        assert_eq!(classify_turn(&turn), TurnActivity::Communication);
    }
}
