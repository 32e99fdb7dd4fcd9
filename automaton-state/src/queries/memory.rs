//! Tiered memory rows.

use automaton_core::memory::{
    EpisodicMemory, MemorySnapshot, RelationshipMemory, SemanticMemory, TurnActivity,
    WorkingMemory,
};
use rusqlite::{OptionalExtension, params};

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

impl StateStore {
    /// Append an episodic row.
    pub fn insert_episodic(&self, row: &EpisodicMemory) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO episodic_memory
                    (id, turn_id, activity, summary, importance, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    row.id,
                    row.turn_id,
                    row.activity.to_string(),
                    row.summary,
                    row.importance,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Upsert a semantic fact; `(category, key)` is unique.
    pub fn upsert_semantic(&self, row: &SemanticMemory) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO semantic_memory (id, category, key, value, confidence, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(category, key) DO UPDATE SET
                    value = ?4, confidence = ?5, updated_at = ?6
                "#,
                params![
                    row.id,
                    row.category,
                    row.key,
                    row.value,
                    row.confidence,
                    row.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Read a semantic fact.
    pub fn get_semantic(
        &self,
        category: &str,
        key: &str,
    ) -> Result<Option<SemanticMemory>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT id, category, key, value, confidence, updated_at
                FROM semantic_memory WHERE category = ?1 AND key = ?2
                "#,
                params![category, key],
                |row| {
                    Ok(SemanticMemory {
                        id: row.get(0)?,
                        category: row.get(1)?,
                        key: row.get(2)?,
                        value: row.get(3)?,
                        confidence: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Create a relationship at trust 0.5, or bump the interaction count
    /// on an existing one.
    pub fn touch_relationship(
        &self,
        id: &str,
        agent_address: &str,
        at: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO relationship_memory
                    (id, agent_address, trust_score, interaction_count, last_interaction_at, notes)
                VALUES (?1, ?2, 0.5, 1, ?3, '')
                ON CONFLICT(agent_address) DO UPDATE SET
                    interaction_count = interaction_count + 1,
                    last_interaction_at = ?3
                "#,
                params![id, agent_address, at],
            )?;
            Ok(())
        })
    }

    /// Read a relationship.
    pub fn get_relationship(
        &self,
        agent_address: &str,
    ) -> Result<Option<RelationshipMemory>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT id, agent_address, trust_score, interaction_count,
                       last_interaction_at, notes
                FROM relationship_memory WHERE agent_address = ?1
                "#,
                [agent_address],
                |row| {
                    Ok(RelationshipMemory {
                        id: row.get(0)?,
                        agent_address: row.get(1)?,
                        trust_score: row.get(2)?,
                        interaction_count: row.get(3)?,
                        last_interaction_at: row.get(4)?,
                        notes: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Append a working-memory entry.
    pub fn insert_working(&self, row: &WorkingMemory) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO working_memory (id, session_id, content, priority, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![row.id, row.session_id, row.content, row.priority, row.created_at],
            )?;
            Ok(())
        })
    }

    /// Trim a session's working memory down to `cap` entries, dropping
    /// lowest priority first and oldest first on ties.
    pub fn trim_working(&self, session_id: &str, cap: usize) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                r#"
                DELETE FROM working_memory
                WHERE session_id = ?1 AND id NOT IN (
                    SELECT id FROM working_memory
                    WHERE session_id = ?1
                    ORDER BY priority DESC, created_at DESC
                    LIMIT ?2
                )
                "#,
                params![session_id, cap as i64],
            )?;
            Ok(affected)
        })
    }

    /// A session's working memory, highest priority first.
    pub fn working_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<WorkingMemory>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, session_id, content, priority, created_at
                FROM working_memory
                WHERE session_id = ?1
                ORDER BY priority DESC, created_at DESC
                "#,
            )?;
            let rows = stmt
                .query_map([session_id], |row| {
                    Ok(WorkingMemory {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        content: row.get(2)?,
                        priority: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Recent episodic rows, newest first.
    pub fn recent_episodic(&self, limit: usize) -> Result<Vec<EpisodicMemory>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, turn_id, activity, summary, importance, created_at
                FROM episodic_memory
                ORDER BY created_at DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt
                .query_map([limit as i64], |row| {
                    let activity: String = row.get(2)?;
                    Ok(EpisodicMemory {
                        id: row.get(0)?,
                        turn_id: row.get(1)?,
                        activity: parse_activity(&activity),
                        summary: row.get(3)?,
                        importance: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Append a metrics/alerts snapshot.
    pub fn insert_snapshot(&self, row: &MemorySnapshot) -> Result<(), StoreError> {
        let metrics = serde_json::to_string(&row.metrics_json).unwrap_or_else(|_| "{}".into());
        let alerts = serde_json::to_string(&row.alerts_json).unwrap_or_else(|_| "[]".into());
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO memory_snapshots (id, metrics_json, alerts_json, snapshot_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![row.id, metrics, alerts, row.snapshot_at],
            )?;
            Ok(())
        })
    }

    /// Delete snapshots older than the cutoff.
    pub fn prune_snapshots(&self, cutoff_iso: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM memory_snapshots WHERE snapshot_at < ?1",
                [cutoff_iso],
            )?;
            Ok(affected)
        })
    }

    /// Most recent snapshot, if any.
    pub fn latest_snapshot(&self) -> Result<Option<MemorySnapshot>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT id, metrics_json, alerts_json, snapshot_at
                FROM memory_snapshots
                ORDER BY snapshot_at DESC LIMIT 1
                "#,
                [],
                |row| {
                    let metrics_raw: String = row.get(1)?;
                    let alerts_raw: String = row.get(2)?;
                    Ok(MemorySnapshot {
                        id: row.get(0)?,
                        metrics_json: safe_parse(
                            &metrics_raw,
                            serde_json::json!({}),
                            "memory_snapshots.metrics_json",
                        ),
                        alerts_json: safe_parse(
                            &alerts_raw,
                            serde_json::json!([]),
                            "memory_snapshots.alerts_json",
                        ),
                        snapshot_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }
}

fn parse_activity(s: &str) -> TurnActivity {
    match s {
        "strategic" => TurnActivity::Strategic,
        "productive" => TurnActivity::Productive,
        "communication" => TurnActivity::Communication,
        "maintenance" => TurnActivity::Maintenance,
        "error" => TurnActivity::Error,
        _ => TurnActivity::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::new_id;

    #[test]
    fn semantic_facts_upsert_by_category_key() {
        let store = StateStore::open_in_memory().unwrap();
        let mut fact = SemanticMemory {
            id: new_id(),
            category: "finance".into(),
            key: "credits_balance".into(),
            value: "1200".into(),
            confidence: 0.9,
            updated_at: automaton_core::id::now_iso(),
        };
        store.upsert_semantic(&fact).unwrap();

        fact.id = new_id();
        fact.value = "800".into();
        store.upsert_semantic(&fact).unwrap();

        let read = store.get_semantic("finance", "credits_balance").unwrap().unwrap();
        assert_eq!(read.value, "800");
    }

    #[test]
    fn relationships_start_at_half_trust_then_count_up() {
        let store = StateStore::open_in_memory().unwrap();
        let peer = "0x2222222222222222222222222222222222222222";
        store
            .touch_relationship(&new_id(), peer, "2026-01-15T09:00:00.000Z")
            .unwrap();
        store
            .touch_relationship(&new_id(), peer, "2026-01-15T10:00:00.000Z")
            .unwrap();

        let read = store.get_relationship(peer).unwrap().unwrap();
        assert_eq!(read.trust_score, 0.5);
        assert_eq!(read.interaction_count, 2);
        assert_eq!(read.last_interaction_at, "2026-01-15T10:00:00.000Z");
    }

    #[test]
    fn working_memory_trims_lowest_priority_oldest_first() {
        let store = StateStore::open_in_memory().unwrap();
        for i in 0..25 {
            store
                .insert_working(&WorkingMemory {
                    id: new_id(),
                    session_id: "s1".into(),
                    content: format!("obs-{i}"),
                    priority: i % 5,
                    created_at: format!("2026-01-15T09:{i:02}:00.000Z"),
                })
                .unwrap();
        }

        let dropped = store.trim_working("s1", 20).unwrap();
        assert_eq!(dropped, 5);
        let remaining = store.working_for_session("s1").unwrap();
        assert_eq!(remaining.len(), 20);
        // The five dropped entries were the oldest priority-0 rows.
        assert!(remaining.iter().filter(|w| w.priority == 0).count() < 5);
    }

    #[test]
    fn snapshots_prune_by_age() {
        let store = StateStore::open_in_memory().unwrap();
        for (i, at) in ["2026-01-01", "2026-01-10", "2026-01-15"].iter().enumerate() {
            store
                .insert_snapshot(&MemorySnapshot {
                    id: format!("s{i}"),
                    metrics_json: serde_json::json!({"turns": i}),
                    alerts_json: serde_json::json!([]),
                    snapshot_at: format!("{at}T00:00:00.000Z"),
                })
                .unwrap();
        }
        let pruned = store.prune_snapshots("2026-01-08T00:00:00.000Z").unwrap();
        assert_eq!(pruned, 1);
        let latest = store.latest_snapshot().unwrap().unwrap();
        assert_eq!(latest.metrics_json["turns"], 2);
    }
}
