//! Tiered memory records written by post-turn ingestion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of what a turn was about, derived from its tool
/// calls and their outcomes. Drives episodic importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnActivity {
    /// Replication, funding, model switching.
    Strategic,
    /// Building: exec, file writes, deployments.
    Productive,
    /// Messaging other agents or the creator.
    Communication,
    /// Balance checks, health checks, pruning.
    Maintenance,
    /// No tool calls, no input.
    Idle,
    /// Most tool calls failed.
    Error,
}

impl fmt::Display for TurnActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strategic => "strategic",
            Self::Productive => "productive",
            Self::Communication => "communication",
            Self::Maintenance => "maintenance",
            Self::Idle => "idle",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

impl TurnActivity {
    /// Episodic importance assigned to turns of this kind, in `[0, 1]`.
    pub fn importance(self) -> f64 {
        match self {
            Self::Strategic => 0.9,
            Self::Productive => 0.7,
            Self::Communication => 0.6,
            Self::Error => 0.5,
            Self::Maintenance => 0.3,
            Self::Idle => 0.1,
        }
    }
}

/// What happened, turn by turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicMemory {
    /// ULID.
    pub id: String,
    /// The turn this episode summarizes.
    pub turn_id: String,
    /// Activity classification.
    pub activity: TurnActivity,
    /// One-line summary of the turn.
    pub summary: String,
    /// Importance in `[0, 1]`.
    pub importance: f64,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

/// A durable fact. Unique per `(category, key)`; upserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticMemory {
    /// ULID.
    pub id: String,
    /// Fact namespace (`finance`, `agents`, `system`...).
    pub category: String,
    /// Fact key within the namespace.
    pub key: String,
    /// Fact value.
    pub value: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// ISO-8601 of the last upsert.
    pub updated_at: String,
}

/// What the agent knows about another agent it has talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipMemory {
    /// ULID.
    pub id: String,
    /// The counterparty's wallet address.
    pub agent_address: String,
    /// Trust in `[0, 1]`. New relationships start at 0.5.
    pub trust_score: f64,
    /// Messages exchanged in either direction.
    pub interaction_count: i64,
    /// ISO-8601 of the last exchange.
    pub last_interaction_at: String,
    /// Free-form notes.
    pub notes: String,
}

/// Short-lived per-session scratch. Bounded to 20 entries per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemory {
    /// ULID.
    pub id: String,
    /// Session the entry belongs to.
    pub session_id: String,
    /// The observation or decision text.
    pub content: String,
    /// Higher survives trimming longer.
    pub priority: i64,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

/// A reusable procedure the agent has learned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralMemory {
    /// ULID.
    pub id: String,
    /// Procedure name.
    pub name: String,
    /// Ordered steps.
    pub steps: serde_json::Value,
    /// Times the procedure worked.
    pub success_count: i64,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

/// Periodic snapshot of metrics and active alerts, written by the
/// reporting task and pruned after retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// ULID.
    pub id: String,
    /// Metrics aggregated by name at snapshot time.
    pub metrics_json: serde_json::Value,
    /// Active alerts at snapshot time.
    pub alerts_json: serde_json::Value,
    /// ISO-8601 snapshot time.
    pub snapshot_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_ranks_strategic_highest() {
        assert!(TurnActivity::Strategic.importance() > TurnActivity::Productive.importance());
        assert!(TurnActivity::Idle.importance() < TurnActivity::Maintenance.importance());
    }
}
