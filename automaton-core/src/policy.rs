//! Risk levels, tool categories, and policy decision records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a tool's blast radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Read-only or reversible.
    Safe,
    /// Mutates local state.
    Caution,
    /// Spends money or touches other agents.
    Dangerous,
    /// Never allowed to run.
    Forbidden,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Dangerous => "dangerous",
            Self::Forbidden => "forbidden",
        };
        f.write_str(s)
    }
}

impl RiskLevel {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "safe" => Some(Self::Safe),
            "caution" => Some(Self::Caution),
            "dangerous" => Some(Self::Dangerous),
            "forbidden" => Some(Self::Forbidden),
            _ => None,
        }
    }
}

/// Functional grouping of tools, used by policy selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Sandbox exec, file, and port operations.
    Sandbox,
    /// Credit transfers and paid fetches.
    Financial,
    /// Relay messaging and feedback.
    Social,
    /// Child spawning and management.
    Replication,
    /// Sleep, model switching, survival posture.
    Survival,
    /// Soul, worklog, and self-modification.
    SelfMod,
    /// Agent-card discovery.
    Discovery,
    /// Everything else.
    System,
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sandbox => "sandbox",
            Self::Financial => "financial",
            Self::Social => "social",
            Self::Replication => "replication",
            Self::Survival => "survival",
            Self::SelfMod => "self_mod",
            Self::Discovery => "discovery",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

/// What the policy engine decided for a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Run the tool.
    Allow,
    /// Refuse the tool; the turn continues.
    Deny,
    /// Refuse and flag for review.
    Quarantine,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Quarantine => "quarantine",
        };
        f.write_str(s)
    }
}

impl PolicyAction {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            "quarantine" => Some(Self::Quarantine),
            _ => None,
        }
    }
}

/// One persisted decision. Exactly one row exists per dispatched tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// ULID.
    pub id: String,
    /// The turn during which the call was dispatched.
    pub turn_id: String,
    /// The tool that was requested.
    pub tool_name: String,
    /// Keccak-256 of the canonical argument encoding.
    pub args_hash: String,
    /// The tool's declared risk level.
    pub risk_level: RiskLevel,
    /// Outcome.
    pub decision: PolicyAction,
    /// Names of all rules that were evaluated, in order.
    pub rules_evaluated: Vec<String>,
    /// Names of rules that fired.
    pub rules_triggered: Vec<String>,
    /// Reason code from the deciding rule, if any.
    pub reason: Option<String>,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_ordering() {
        assert!(RiskLevel::Safe < RiskLevel::Caution);
        assert!(RiskLevel::Dangerous < RiskLevel::Forbidden);
    }

    #[test]
    fn action_round_trip() {
        for a in [PolicyAction::Allow, PolicyAction::Deny, PolicyAction::Quarantine] {
            assert_eq!(PolicyAction::parse(&a.to_string()), Some(a));
        }
    }
}
