//! Conversation context from recent turns, under the budget shares.

use automaton_core::clients::{ChatMessage, ChatRole};
use automaton_core::AgentTurn;

use crate::prompt::{RECENT_TURNS_SHARE, TOKEN_BUDGET, TOOL_RESULTS_SHARE};

/// Build the message list for a model call: recent turns rendered as
/// assistant/user exchanges (newest last), then the fresh input.
///
/// Recent turns get half the token budget; tool results inside them a
/// fifth. Oldest turns fall off first.
pub fn build_messages(
    recent_turns: &[AgentTurn],
    input: Option<(&str, &str)>,
) -> Vec<ChatMessage> {
    let turns_budget_chars = (TOKEN_BUDGET as f64 * RECENT_TURNS_SHARE) as usize * 4;
    let results_budget_chars = (TOKEN_BUDGET as f64 * TOOL_RESULTS_SHARE) as usize * 4;
    let mut results_spent = 0usize;

    // Newest first on input; assemble backwards then reverse.
    let mut rendered: Vec<ChatMessage> = Vec::new();
    let mut spent = 0usize;

    for turn in recent_turns {
        let mut parts: Vec<String> = Vec::new();
        if !turn.thinking.is_empty() {
            parts.push(turn.thinking.clone());
        }
        for call in &turn.tool_calls {
            let mut result = call.result.clone();
            let remaining = results_budget_chars.saturating_sub(results_spent);
            if result.len() > remaining {
                result = truncate(&result, remaining);
            }
            results_spent += result.len();
            parts.push(format!("[{}] {}", call.name, result));
        }
        let body = parts.join("\n");
        if body.is_empty() {
            continue;
        }
        if spent + body.len() > turns_budget_chars {
            break;
        }
        spent += body.len();

        if let Some(user_input) = &turn.input {
            rendered.push(ChatMessage::new(ChatRole::Assistant, body));
            rendered.push(ChatMessage::new(ChatRole::User, user_input.clone()));
        } else {
            rendered.push(ChatMessage::new(ChatRole::Assistant, body));
        }
    }

    rendered.reverse();

    let mut messages = rendered;
    if let Some((content, source)) = input {
        messages.push(ChatMessage::new(
            ChatRole::User,
            format!("[{source}] {content}"),
        ));
    }
    if messages.is_empty() {
        messages.push(ChatMessage::new(ChatRole::User, "[system] continue"));
    }
    messages
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::{AgentState, InputSource, TokenUsage, ToolCallResult};

    fn turn(thinking: &str, input: Option<&str>) -> AgentTurn {
        AgentTurn {
            id: automaton_core::new_id(),
            timestamp: automaton_core::id::now_iso(),
            state: AgentState::Running,
            input: input.map(Into::into),
            input_source: Some(InputSource::Heartbeat),
            thinking: thinking.into(),
            tool_calls: vec![],
            token_usage: TokenUsage::default(),
            cost_cents: 0,
        }
    }

    #[test]
    fn newest_turn_lands_last_before_input() {
        // recent_turns comes newest-first from the store.
        let turns = vec![turn("newest", None), turn("older", None)];
        let messages = build_messages(&turns, Some(("wake up", "heartbeat")));

        let texts: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        let older = texts.iter().position(|t| t.contains("older")).unwrap();
        let newest = texts.iter().position(|t| t.contains("newest")).unwrap();
        assert!(older < newest);
        assert!(texts.last().unwrap().contains("wake up"));
    }

    #[test]
    fn empty_context_still_produces_a_user_message() {
        let messages = build_messages(&[], None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
    }

    #[test]
    fn oversized_history_drops_oldest() {
        let big = "x".repeat((TOKEN_BUDGET * 4) / 3);
        let turns = vec![turn(&big, None), turn(&big, None), turn(&big, None)];
        let messages = build_messages(&turns, None);
        // At most one and a half of those fits in the 50% share.
        assert!(messages.len() <= 2);
    }

    #[test]
    fn tool_results_are_bounded_separately() {
        let mut t = turn("thinking", None);
        t.tool_calls.push(ToolCallResult {
            id: "c1".into(),
            name: "web_fetch".into(),
            args: serde_json::Value::Null,
            result: "y".repeat(TOKEN_BUDGET * 4),
            duration_ms: 1,
            error: None,
        });
        let messages = build_messages(&[t], None);
        let total: usize = messages.iter().map(|m| m.content.len()).sum();
        let results_budget = (TOKEN_BUDGET as f64 * TOOL_RESULTS_SHARE) as usize * 4;
        assert!(total <= results_budget + 4096);
    }
}
