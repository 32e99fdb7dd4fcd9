//! Persisted policy decisions, one row per dispatched tool call.

use automaton_core::{PolicyAction, PolicyDecision, RiskLevel};
use rusqlite::params;

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

impl StateStore {
    /// Append a decision row.
    pub fn insert_policy_decision(&self, decision: &PolicyDecision) -> Result<(), StoreError> {
        let evaluated =
            serde_json::to_string(&decision.rules_evaluated).unwrap_or_else(|_| "[]".into());
        let triggered =
            serde_json::to_string(&decision.rules_triggered).unwrap_or_else(|_| "[]".into());
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO policy_decisions
                    (id, turn_id, tool_name, args_hash, risk_level, decision,
                     rules_evaluated, rules_triggered, reason, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    decision.id,
                    decision.turn_id,
                    decision.tool_name,
                    decision.args_hash,
                    decision.risk_level.to_string(),
                    decision.decision.to_string(),
                    evaluated,
                    triggered,
                    decision.reason,
                    decision.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// All decisions taken during a turn, in order.
    pub fn policy_decisions_for_turn(
        &self,
        turn_id: &str,
    ) -> Result<Vec<PolicyDecision>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, turn_id, tool_name, args_hash, risk_level, decision,
                       rules_evaluated, rules_triggered, reason, created_at
                FROM policy_decisions
                WHERE turn_id = ?1
                ORDER BY rowid
                "#,
            )?;
            let rows = stmt
                .query_map([turn_id], |row| {
                    let risk: String = row.get(4)?;
                    let action: String = row.get(5)?;
                    let evaluated_raw: String = row.get(6)?;
                    let triggered_raw: String = row.get(7)?;
                    Ok(PolicyDecision {
                        id: row.get(0)?,
                        turn_id: row.get(1)?,
                        tool_name: row.get(2)?,
                        args_hash: row.get(3)?,
                        risk_level: RiskLevel::parse(&risk).unwrap_or(RiskLevel::Forbidden),
                        decision: PolicyAction::parse(&action).unwrap_or(PolicyAction::Deny),
                        rules_evaluated: safe_parse(
                            &evaluated_raw,
                            vec![],
                            "policy_decisions.rules_evaluated",
                        ),
                        rules_triggered: safe_parse(
                            &triggered_raw,
                            vec![],
                            "policy_decisions.rules_triggered",
                        ),
                        reason: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::new_id;

    #[test]
    fn decision_round_trip() {
        let store = StateStore::open_in_memory().unwrap();
        let decision = PolicyDecision {
            id: new_id(),
            turn_id: "T1".into(),
            tool_name: "exec".into(),
            args_hash: "0xabc".into(),
            risk_level: RiskLevel::Dangerous,
            decision: PolicyAction::Deny,
            rules_evaluated: vec!["forbidden-risk".into(), "forbidden-command-pattern".into()],
            rules_triggered: vec!["forbidden-command-pattern".into()],
            reason: Some("self_harm".into()),
            created_at: automaton_core::id::now_iso(),
        };
        store.insert_policy_decision(&decision).unwrap();

        let read = store.policy_decisions_for_turn("T1").unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].decision, PolicyAction::Deny);
        assert_eq!(read[0].rules_triggered, vec!["forbidden-command-pattern"]);
        assert_eq!(read[0].reason.as_deref(), Some("self_harm"));
    }
}
