//! The engine: ordered evaluation plus decision persistence.

use std::sync::Arc;

use automaton_core::{PolicyAction, PolicyDecision, Result, RiskLevel, new_id};
use automaton_crypto::args_hash;
use automaton_state::StateStore;

use crate::rule::{PolicyRequest, PolicyRule};

/// The engine's answer for one tool call.
#[derive(Debug, Clone)]
pub struct PolicyVerdict {
    /// What happens to the call.
    pub action: PolicyAction,
    /// Reason code from the deciding rule.
    pub reason_code: Option<String>,
    /// Human-readable explanation for the tool result.
    pub message: Option<String>,
}

impl PolicyVerdict {
    /// Whether the call may execute.
    pub fn is_allowed(&self) -> bool {
        self.action == PolicyAction::Allow
    }
}

/// Ordered rules plus the store the decisions land in.
pub struct PolicyEngine {
    rules: Vec<Box<dyn PolicyRule>>,
    store: Arc<StateStore>,
}

impl PolicyEngine {
    /// Build an engine; rules are sorted by priority ascending once.
    pub fn new(store: Arc<StateStore>, mut rules: Vec<Box<dyn PolicyRule>>) -> Self {
        rules.sort_by_key(|r| r.priority());
        Self { rules, store }
    }

    /// Evaluate one tool call and persist the decision row.
    ///
    /// The first matching rule with a non-allow action wins; explicit
    /// allow results are recorded as triggers but do not short-circuit.
    /// No rule firing means allow.
    pub fn evaluate(
        &self,
        turn_id: &str,
        risk: RiskLevel,
        request: &PolicyRequest<'_>,
    ) -> Result<PolicyVerdict> {
        let mut evaluated = Vec::new();
        let mut triggered = Vec::new();
        let mut verdict = PolicyVerdict {
            action: PolicyAction::Allow,
            reason_code: None,
            message: None,
        };

        for rule in &self.rules {
            if !rule.selector().matches(request) {
                continue;
            }
            evaluated.push(rule.name().to_string());
            let Some(result) = rule.evaluate(request) else {
                continue;
            };
            triggered.push(rule.name().to_string());
            if result.action != PolicyAction::Allow {
                verdict = PolicyVerdict {
                    action: result.action,
                    reason_code: Some(result.reason_code),
                    message: Some(result.message),
                };
                break;
            }
        }

        let decision = PolicyDecision {
            id: new_id(),
            turn_id: turn_id.to_string(),
            tool_name: request.tool_name.to_string(),
            args_hash: args_hash(request.args),
            risk_level: risk,
            decision: verdict.action,
            rules_evaluated: evaluated,
            rules_triggered: triggered,
            reason: verdict.reason_code.clone(),
            created_at: automaton_core::id::now_iso(),
        };
        self.store.insert_policy_decision(&decision)?;

        Ok(verdict)
    }
}
