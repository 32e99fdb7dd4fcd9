//! The mandatory built-in rules.

use regex::RegexSet;
use std::sync::{Arc, LazyLock};

use automaton_core::{RiskLevel, SpendCategory, ToolCategory, TreasuryPolicy};

use crate::rule::{PolicyRequest, PolicyRule, PolicyRuleResult, RuleSelector};
use crate::spend::SpendTracker;

/// Command patterns the `exec` tool may never run: self-destruction of
/// the agent's own state and safety infrastructure, process murder,
/// and secret exfiltration.
pub const FORBIDDEN_COMMAND_PATTERNS: &[&str] = &[
    // Deleting the agent's home, state, wallet, or constitution.
    r"rm\s+(-\w+\s+)*\S*(\.automaton|state\.db|wallet\.json|constitution\.md)",
    // Killing the agent's own process tree.
    r"(pkill|killall)\s+(-\w+\s+)*\S*automaton",
    r"kill\s+(-9\s+)?\$\$",
    // Gutting protected tables.
    r"(?i)(drop\s+table|truncate|delete\s+from)\s+(agent_turns|identity|children|child_lifecycle_events|policy_decisions|spend_records|heartbeat_schedule)",
    // Rewriting safety infrastructure in place.
    r"sed\s+.*(constitution\.md|heartbeat\.yml|policy)",
    // Reading secrets.
    r"cat\s+\S*(wallet\.json|private_key|\.env)",
];

static FORBIDDEN_COMMANDS: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(FORBIDDEN_COMMAND_PATTERNS).expect("forbidden command regexes"));

/// Files the write tools must never touch.
pub const PROTECTED_FILES: &[&str] = &[
    "state.db",
    "wallet.json",
    "constitution.md",
    ".automaton/heartbeat.yml",
];

/// Spend category for a financial tool, if it is one.
pub fn financial_category(tool_name: &str) -> Option<SpendCategory> {
    match tool_name {
        "transfer_credits" => Some(SpendCategory::Transfer),
        "x402_fetch" => Some(SpendCategory::X402),
        _ => None,
    }
}

/// The cents a financial call intends to move, from its arguments.
pub fn financial_amount_cents(tool_name: &str, args: &serde_json::Value) -> i64 {
    match tool_name {
        "transfer_credits" => args["amount_cents"].as_i64().unwrap_or(0),
        "x402_fetch" => args["max_payment_cents"].as_i64().unwrap_or(0),
        _ => 0,
    }
}

/// forbidden-risk: anything declared `forbidden` is denied outright.
struct ForbiddenRisk;

impl PolicyRule for ForbiddenRisk {
    fn name(&self) -> &str {
        "forbidden-risk"
    }
    fn priority(&self) -> i64 {
        10
    }
    fn selector(&self) -> RuleSelector {
        RuleSelector::ByRisk(RiskLevel::Forbidden)
    }
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult> {
        Some(PolicyRuleResult::deny(
            "forbidden_risk",
            format!("Blocked: {} is a forbidden tool", request.tool_name),
        ))
    }
}

/// forbidden-command-pattern: `exec` against the self-harm pattern set.
struct ForbiddenCommandPattern;

impl PolicyRule for ForbiddenCommandPattern {
    fn name(&self) -> &str {
        "forbidden-command-pattern"
    }
    fn priority(&self) -> i64 {
        20
    }
    fn selector(&self) -> RuleSelector {
        RuleSelector::ByName(&["exec"])
    }
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult> {
        let command = request.args["command"].as_str().unwrap_or("");
        if FORBIDDEN_COMMANDS.is_match(command) {
            Some(PolicyRuleResult::deny(
                "self_harm",
                "Blocked: command matches a forbidden pattern",
            ))
        } else {
            None
        }
    }
}

/// protected-file-write: write tools against the protected set.
struct ProtectedFileWrite;

impl PolicyRule for ProtectedFileWrite {
    fn name(&self) -> &str {
        "protected-file-write"
    }
    fn priority(&self) -> i64 {
        30
    }
    fn selector(&self) -> RuleSelector {
        RuleSelector::ByName(&["write_file", "edit_file"])
    }
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult> {
        let path = request.args["path"].as_str().unwrap_or("");
        if PROTECTED_FILES.iter().any(|p| path.ends_with(p)) {
            Some(PolicyRuleResult::deny(
                "protected_file",
                format!("Blocked: {path} is protected"),
            ))
        } else {
            None
        }
    }
}

/// self-sandbox-delete: refusing to saw off the branch we sit on.
struct SelfSandboxDelete {
    own_sandbox_id: String,
}

impl PolicyRule for SelfSandboxDelete {
    fn name(&self) -> &str {
        "self-sandbox-delete"
    }
    fn priority(&self) -> i64 {
        40
    }
    fn selector(&self) -> RuleSelector {
        RuleSelector::ByName(&["delete_sandbox"])
    }
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult> {
        let target = request.args["sandbox_id"].as_str().unwrap_or("");
        if target == self.own_sandbox_id {
            Some(PolicyRuleResult::deny(
                "self_preservation",
                "Blocked: Cannot delete own sandbox",
            ))
        } else {
            None
        }
    }
}

/// treasury-limit: financial calls must fit the spend windows.
struct TreasuryLimit {
    tracker: Arc<SpendTracker>,
    policy: TreasuryPolicy,
}

impl PolicyRule for TreasuryLimit {
    fn name(&self) -> &str {
        "treasury-limit"
    }
    fn priority(&self) -> i64 {
        50
    }
    fn selector(&self) -> RuleSelector {
        RuleSelector::ByCategory(ToolCategory::Financial)
    }
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult> {
        let category = financial_category(request.tool_name)?;
        let amount = financial_amount_cents(request.tool_name, request.args);
        match self.tracker.check_limit(amount, category, &self.policy) {
            Ok(check) if check.allowed => None,
            Ok(check) => Some(PolicyRuleResult::deny(
                "treasury_limit",
                check
                    .reason
                    .unwrap_or_else(|| "spend limit exceeded".into()),
            )),
            Err(e) => {
                // A broken limit check fails closed.
                tracing::error!(error = %e, "spend limit check failed");
                Some(PolicyRuleResult::deny(
                    "treasury_limit",
                    "Blocked: spend limit check unavailable",
                ))
            }
        }
    }
}

/// turn-transfer-count: at most N financial calls per turn.
struct TurnTransferCount {
    max_per_turn: u32,
}

impl PolicyRule for TurnTransferCount {
    fn name(&self) -> &str {
        "turn-transfer-count"
    }
    fn priority(&self) -> i64 {
        60
    }
    fn selector(&self) -> RuleSelector {
        RuleSelector::ByCategory(ToolCategory::Financial)
    }
    fn evaluate(&self, request: &PolicyRequest<'_>) -> Option<PolicyRuleResult> {
        if request.turn.turn_financial_call_count >= self.max_per_turn {
            Some(PolicyRuleResult::deny(
                "transfer_count",
                format!(
                    "Blocked: more than {} financial calls in one turn",
                    self.max_per_turn
                ),
            ))
        } else {
            None
        }
    }
}

/// The mandatory rule set, in priority order.
pub fn builtin_rules(
    own_sandbox_id: &str,
    tracker: Arc<SpendTracker>,
    policy: &TreasuryPolicy,
) -> Vec<Box<dyn PolicyRule>> {
    vec![
        Box::new(ForbiddenRisk),
        Box::new(ForbiddenCommandPattern),
        Box::new(ProtectedFileWrite),
        Box::new(SelfSandboxDelete {
            own_sandbox_id: own_sandbox_id.to_string(),
        }),
        Box::new(TreasuryLimit {
            tracker,
            policy: policy.clone(),
        }),
        Box::new(TurnTransferCount {
            max_per_turn: policy.max_transfers_per_turn,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::TurnPolicyContext;
    use automaton_core::PolicyAction;

    fn eval(
        rule: &dyn PolicyRule,
        tool: &str,
        risk: RiskLevel,
        category: ToolCategory,
        args: serde_json::Value,
        turn: &TurnPolicyContext,
    ) -> Option<PolicyRuleResult> {
        let request = PolicyRequest {
            tool_name: tool,
            risk,
            category,
            args: &args,
            turn,
        };
        if rule.selector().matches(&request) {
            rule.evaluate(&request)
        } else {
            None
        }
    }

    #[test]
    fn forbidden_commands_catch_the_usual_suspects() {
        let rule = ForbiddenCommandPattern;
        let turn = TurnPolicyContext::default();
        for command in [
            "rm -rf ~/.automaton",
            "rm -f /home/agent/.automaton/state.db",
            "rm wallet.json",
            "pkill -f automaton",
            "sqlite3 state.db 'DROP TABLE agent_turns'",
            "sqlite3 state.db 'DELETE FROM spend_records'",
            "sed -i s/deny/allow/ constitution.md",
            "cat ~/.automaton/wallet.json",
        ] {
            let result = eval(
                &rule,
                "exec",
                RiskLevel::Dangerous,
                ToolCategory::Sandbox,
                serde_json::json!({"command": command}),
                &turn,
            );
            let result = result.unwrap_or_else(|| panic!("{command:?} should be denied"));
            assert_eq!(result.action, PolicyAction::Deny);
            assert_eq!(result.reason_code, "self_harm");
        }
    }

    #[test]
    fn ordinary_commands_pass() {
        let rule = ForbiddenCommandPattern;
        let turn = TurnPolicyContext::default();
        for command in ["ls -la", "cargo build", "curl https://example.com", "rm /tmp/scratch.txt"] {
            assert!(
                eval(
                    &rule,
                    "exec",
                    RiskLevel::Dangerous,
                    ToolCategory::Sandbox,
                    serde_json::json!({"command": command}),
                    &turn,
                )
                .is_none(),
                "{command:?} should pass"
            );
        }
    }

    #[test]
    fn forbidden_risk_denies_unconditionally() {
        let rule = ForbiddenRisk;
        let turn = TurnPolicyContext::default();
        let result = eval(
            &rule,
            "anything",
            RiskLevel::Forbidden,
            ToolCategory::System,
            serde_json::json!({}),
            &turn,
        )
        .unwrap();
        assert_eq!(result.action, PolicyAction::Deny);
        // Non-forbidden risk never matches the selector.
        assert!(
            eval(
                &rule,
                "anything",
                RiskLevel::Safe,
                ToolCategory::System,
                serde_json::json!({}),
                &turn,
            )
            .is_none()
        );
    }

    #[test]
    fn protected_files_refuse_writes() {
        let rule = ProtectedFileWrite;
        let turn = TurnPolicyContext::default();
        let denied = eval(
            &rule,
            "write_file",
            RiskLevel::Caution,
            ToolCategory::Sandbox,
            serde_json::json!({"path": "/home/agent/.automaton/wallet.json"}),
            &turn,
        );
        assert!(denied.is_some());

        let fine = eval(
            &rule,
            "write_file",
            RiskLevel::Caution,
            ToolCategory::Sandbox,
            serde_json::json!({"path": "/tmp/notes.md"}),
            &turn,
        );
        assert!(fine.is_none());
    }

    #[test]
    fn own_sandbox_is_sacred() {
        let rule = SelfSandboxDelete {
            own_sandbox_id: "sbx-self".into(),
        };
        let turn = TurnPolicyContext::default();
        let denied = eval(
            &rule,
            "delete_sandbox",
            RiskLevel::Dangerous,
            ToolCategory::Sandbox,
            serde_json::json!({"sandbox_id": "sbx-self"}),
            &turn,
        )
        .unwrap();
        assert_eq!(denied.message, "Blocked: Cannot delete own sandbox");

        assert!(
            eval(
                &rule,
                "delete_sandbox",
                RiskLevel::Dangerous,
                ToolCategory::Sandbox,
                serde_json::json!({"sandbox_id": "sbx-other"}),
                &turn,
            )
            .is_none()
        );
    }

    #[test]
    fn transfer_count_caps_per_turn() {
        let rule = TurnTransferCount { max_per_turn: 3 };
        let mut turn = TurnPolicyContext::default();
        let args = serde_json::json!({"to": "0xdead", "amount_cents": 1});

        turn.turn_financial_call_count = 2;
        assert!(
            eval(
                &rule,
                "transfer_credits",
                RiskLevel::Dangerous,
                ToolCategory::Financial,
                args.clone(),
                &turn,
            )
            .is_none()
        );

        turn.turn_financial_call_count = 3;
        let denied = eval(
            &rule,
            "transfer_credits",
            RiskLevel::Dangerous,
            ToolCategory::Financial,
            args,
            &turn,
        )
        .unwrap();
        assert_eq!(denied.reason_code, "transfer_count");
    }

    #[test]
    fn amount_extraction_per_tool() {
        assert_eq!(
            financial_amount_cents(
                "transfer_credits",
                &serde_json::json!({"amount_cents": 250})
            ),
            250
        );
        assert_eq!(
            financial_amount_cents("x402_fetch", &serde_json::json!({"max_payment_cents": 40})),
            40
        );
        assert_eq!(financial_amount_cents("exec", &serde_json::json!({})), 0);
    }
}
