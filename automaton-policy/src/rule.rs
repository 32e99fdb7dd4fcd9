//! The rule interface: selectors, requests, results.

use automaton_core::{InputSource, PolicyAction, RiskLevel, ToolCategory};

/// Per-turn counters the rules consult.
#[derive(Debug, Clone, Default)]
pub struct TurnPolicyContext {
    /// Where the turn's input came from.
    pub input_source: Option<InputSource>,
    /// Tool calls dispatched so far this turn.
    pub turn_tool_call_count: u32,
    /// Financial tool calls dispatched so far this turn.
    pub turn_financial_call_count: u32,
    /// Cents spent so far this session.
    pub session_spend_cents: i64,
}

/// Everything a rule sees about one tool call.
pub struct PolicyRequest<'a> {
    /// The requested tool.
    pub tool_name: &'a str,
    /// The tool's declared risk level.
    pub risk: RiskLevel,
    /// The tool's category.
    pub category: ToolCategory,
    /// Arguments as supplied by the model.
    pub args: &'a serde_json::Value,
    /// Per-turn counters.
    pub turn: &'a TurnPolicyContext,
}

/// A rule's verdict when it applies.
#[derive(Debug, Clone)]
pub struct PolicyRuleResult {
    /// What to do with the call.
    pub action: PolicyAction,
    /// Machine-readable reason code.
    pub reason_code: String,
    /// Human-readable explanation, surfaced in the tool result.
    pub message: String,
}

impl PolicyRuleResult {
    /// A deny with code and message.
    pub fn deny(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: PolicyAction::Deny,
            reason_code: code.into(),
            message: message.into(),
        }
    }
}

/// Which calls a rule looks at.
pub enum RuleSelector {
    /// Only these tool names.
    ByName(&'static [&'static str]),
    /// Only this category.
    ByCategory(ToolCategory),
    /// Only this risk level.
    ByRisk(RiskLevel),
    /// Every call.
    All,
}

impl RuleSelector {
    /// Whether this selector matches the request.
    pub fn matches(&self, request: &PolicyRequest<'_>) -> bool {
        match self {
            Self::ByName(names) => names.contains(&request.tool_name),
            Self::ByCategory(category) => *category == request.category,
            Self::ByRisk(risk) => *risk == request.risk,
            Self::All => true,
        }
    }
}

/// One ordered rule. Returning `None` means "not applicable"; a result
/// with [`PolicyAction::Allow`] is recorded but does not short-circuit.
pub trait PolicyRule: Send + Sync {
    /// Unique rule name, recorded on every decision.
    fn name(&self) -> &str;

    /// Evaluation order, ascending.
    fn priority(&self) -> i64;

    /// Which calls this rule inspects.
    fn selector(&self) -> RuleSelector;

    /// Judge a matching call.
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(
        tool: &'a str,
        risk: RiskLevel,
        category: ToolCategory,
        args: &'a serde_json::Value,
        turn: &'a TurnPolicyContext,
    ) -> PolicyRequest<'a> {
        PolicyRequest {
            tool_name: tool,
            risk,
            category,
            args,
            turn,
        }
    }

    #[test]
    fn selectors_match_what_they_claim() {
        let args = serde_json::json!({});
        let turn = TurnPolicyContext::default();
        let req = request(
            "exec",
            RiskLevel::Dangerous,
            ToolCategory::Sandbox,
            &args,
            &turn,
        );

        assert!(RuleSelector::ByName(&["exec", "write_file"]).matches(&req));
        assert!(!RuleSelector::ByName(&["transfer_credits"]).matches(&req));
        assert!(RuleSelector::ByCategory(ToolCategory::Sandbox).matches(&req));
        assert!(!RuleSelector::ByCategory(ToolCategory::Financial).matches(&req));
        assert!(RuleSelector::ByRisk(RiskLevel::Dangerous).matches(&req));
        assert!(RuleSelector::All.matches(&req));
    }
}
