//! Turn, tool-call, and reasoning-step rows.

use automaton_core::{AgentState, AgentTurn, InputSource, ReasoningStep, ToolCallResult};
use rusqlite::{Row, params};

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

fn turn_from_row(row: &Row<'_>) -> Result<AgentTurn, rusqlite::Error> {
    let state: String = row.get(2)?;
    let input_source: Option<String> = row.get(4)?;
    let usage_raw: String = row.get(6)?;
    Ok(AgentTurn {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        state: AgentState::parse(&state).unwrap_or(AgentState::Running),
        input: row.get(3)?,
        input_source: input_source.as_deref().and_then(InputSource::parse),
        thinking: row.get(5)?,
        tool_calls: vec![],
        token_usage: safe_parse(&usage_raw, Default::default(), "agent_turns.token_usage"),
        cost_cents: row.get(7)?,
    })
}

impl StateStore {
    /// Persist one completed turn: the turn row, one row per tool call,
    /// and the parsed reasoning steps, all in a single transaction.
    pub fn insert_turn(
        &self,
        turn: &AgentTurn,
        steps: &[ReasoningStep],
    ) -> Result<(), StoreError> {
        let usage = serde_json::to_string(&turn.token_usage).unwrap_or_else(|_| "{}".into());
        self.run_transaction(|tx| {
            tx.execute(
                r#"
                INSERT INTO agent_turns
                    (id, timestamp, state, input, input_source, thinking, token_usage, cost_cents)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    turn.id,
                    turn.timestamp,
                    turn.state.to_string(),
                    turn.input,
                    turn.input_source.map(|s| s.to_string()),
                    turn.thinking,
                    usage,
                    turn.cost_cents,
                ],
            )?;

            for call in &turn.tool_calls {
                tx.execute(
                    r#"
                    INSERT INTO tool_calls (id, turn_id, name, args, result, duration_ms, error)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        call.id,
                        turn.id,
                        call.name,
                        serde_json::to_string(&call.args).unwrap_or_else(|_| "null".into()),
                        call.result,
                        call.duration_ms as i64,
                        call.error,
                    ],
                )?;
            }

            for step in steps {
                tx.execute(
                    r#"
                    INSERT INTO reasoning_steps (id, turn_id, step_number, phase, content)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        step.id,
                        step.turn_id,
                        step.step_number,
                        step.phase.to_string(),
                        step.content,
                    ],
                )?;
            }

            Ok(())
        })
    }

    /// Most recent turns, newest first, with their tool calls attached.
    pub fn recent_turns(&self, limit: usize) -> Result<Vec<AgentTurn>, StoreError> {
        let mut turns = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, timestamp, state, input, input_source, thinking, token_usage, cost_cents
                FROM agent_turns
                ORDER BY timestamp DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt
                .query_map([limit as i64], |row| turn_from_row(row))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        for turn in &mut turns {
            turn.tool_calls = self.tool_calls_for_turn(&turn.id)?;
        }
        Ok(turns)
    }

    /// Tool calls for a turn, in dispatch order.
    pub fn tool_calls_for_turn(&self, turn_id: &str) -> Result<Vec<ToolCallResult>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, name, args, result, duration_ms, error
                FROM tool_calls
                WHERE turn_id = ?1
                ORDER BY rowid
                "#,
            )?;
            let rows = stmt
                .query_map([turn_id], |row| {
                    let args_raw: String = row.get(2)?;
                    let duration: i64 = row.get(4)?;
                    Ok(ToolCallResult {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        args: safe_parse(&args_raw, serde_json::Value::Null, "tool_calls.args"),
                        result: row.get(3)?,
                        duration_ms: duration.max(0) as u64,
                        error: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Reasoning steps for a turn, ordered by step number.
    pub fn reasoning_steps_for_turn(
        &self,
        turn_id: &str,
    ) -> Result<Vec<ReasoningStep>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, turn_id, step_number, phase, content
                FROM reasoning_steps
                WHERE turn_id = ?1
                ORDER BY step_number
                "#,
            )?;
            let rows = stmt
                .query_map([turn_id], |row| {
                    let phase: String = row.get(3)?;
                    Ok(ReasoningStep {
                        id: row.get(0)?,
                        turn_id: row.get(1)?,
                        step_number: row.get(2)?,
                        phase: automaton_core::OodaPhase::parse(&phase)
                            .unwrap_or(automaton_core::OodaPhase::Observe),
                        content: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Total number of persisted turns.
    pub fn turn_count(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM agent_turns", [], |row| row.get(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::{OodaPhase, TokenUsage, new_id};

    fn sample_turn(id: &str, calls: usize) -> AgentTurn {
        AgentTurn {
            id: id.into(),
            timestamp: automaton_core::id::now_iso(),
            state: AgentState::Running,
            input: Some("wake".into()),
            input_source: Some(InputSource::Heartbeat),
            thinking: "observing balances".into(),
            tool_calls: (0..calls)
                .map(|i| ToolCallResult {
                    id: format!("{id}-call-{i}"),
                    name: "check_credits".into(),
                    args: serde_json::json!({}),
                    result: "balance: 123".into(),
                    duration_ms: 40,
                    error: None,
                })
                .collect(),
            token_usage: TokenUsage {
                prompt_tokens: 1000,
                completion_tokens: 200,
                total_tokens: 1200,
            },
            cost_cents: 2,
        }
    }

    #[test]
    fn turn_bundle_persists_atomically() {
        let store = StateStore::open_in_memory().unwrap();
        let turn = sample_turn(&new_id(), 3);
        let steps = vec![ReasoningStep {
            id: new_id(),
            turn_id: turn.id.clone(),
            step_number: 0,
            phase: OodaPhase::Observe,
            content: "credits look fine".into(),
        }];

        store.insert_turn(&turn, &steps).unwrap();

        assert_eq!(store.turn_count().unwrap(), 1);
        let calls = store.tool_calls_for_turn(&turn.id).unwrap();
        assert_eq!(calls.len(), turn.tool_calls.len());
        let read_steps = store.reasoning_steps_for_turn(&turn.id).unwrap();
        assert_eq!(read_steps.len(), 1);
        assert_eq!(read_steps[0].phase, OodaPhase::Observe);
    }

    #[test]
    fn recent_turns_newest_first_with_calls() {
        let store = StateStore::open_in_memory().unwrap();
        for i in 0..5 {
            let mut turn = sample_turn(&new_id(), 1);
            turn.timestamp = format!("2026-01-15T09:0{i}:00.000Z");
            store.insert_turn(&turn, &[]).unwrap();
        }

        let recent = store.recent_turns(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].timestamp > recent[1].timestamp);
        assert_eq!(recent[0].tool_calls.len(), 1);
    }

    #[test]
    fn corrupt_usage_column_degrades_to_default() {
        let store = StateStore::open_in_memory().unwrap();
        let turn = sample_turn(&new_id(), 0);
        store.insert_turn(&turn, &[]).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE agent_turns SET token_usage = '{broken' WHERE id = ?1",
                    [&turn.id],
                )?;
                Ok(())
            })
            .unwrap();

        let read = store.recent_turns(1).unwrap();
        assert_eq!(read[0].token_usage, TokenUsage::default());
    }
}
