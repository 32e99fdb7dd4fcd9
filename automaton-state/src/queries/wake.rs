//! Wake-event queue rows. FIFO by rowid, consumed at most once.

use automaton_core::WakeEvent;
use rusqlite::params;

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

impl StateStore {
    /// Queue a wake event. Returns its monotonic id.
    pub fn enqueue_wake(
        &self,
        source: &str,
        reason: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, StoreError> {
        let now = automaton_core::id::now_iso();
        let payload_json = serde_json::to_string(payload).unwrap_or_else(|_| "null".into());
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO wake_events (source, reason, payload, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![source, reason, payload_json, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Consume up to `limit` pending events in FIFO order, marking them
    /// consumed in the same transaction that reads them.
    pub fn consume_wake_events(&self, limit: usize) -> Result<Vec<WakeEvent>, StoreError> {
        let now = automaton_core::id::now_iso();
        self.run_transaction(|tx| {
            let mut stmt = tx.prepare(
                r#"
                SELECT id, source, reason, payload, created_at
                FROM wake_events
                WHERE consumed_at IS NULL
                ORDER BY id
                LIMIT ?1
                "#,
            )?;
            let events = stmt
                .query_map([limit as i64], |row| {
                    let payload_raw: String = row.get(3)?;
                    Ok(WakeEvent {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        reason: row.get(2)?,
                        payload: safe_parse(
                            &payload_raw,
                            serde_json::Value::Null,
                            "wake_events.payload",
                        ),
                        created_at: row.get(4)?,
                        consumed_at: Some(now.clone()),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            for event in &events {
                tx.execute(
                    "UPDATE wake_events SET consumed_at = ?1 WHERE id = ?2",
                    params![now, event.id],
                )?;
            }
            Ok(events)
        })
    }

    /// Number of pending (unconsumed) events.
    pub fn pending_wake_count(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM wake_events WHERE consumed_at IS NULL",
                [],
                |row| row.get(0),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::store::StateStore;

    #[test]
    fn events_drain_fifo_and_only_once() {
        let store = StateStore::open_in_memory().unwrap();
        for i in 0..4 {
            store
                .enqueue_wake("heartbeat", &format!("reason-{i}"), &serde_json::Value::Null)
                .unwrap();
        }
        assert_eq!(store.pending_wake_count().unwrap(), 4);

        let first = store.consume_wake_events(2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].reason, "reason-0");
        assert_eq!(first[1].reason, "reason-1");
        assert!(first[0].id < first[1].id);

        let rest = store.consume_wake_events(10).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].reason, "reason-2");
        assert_eq!(store.pending_wake_count().unwrap(), 0);
        assert!(store.consume_wake_events(10).unwrap().is_empty());
    }
}
