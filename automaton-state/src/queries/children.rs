//! Child rows and their append-only lifecycle event log.

use automaton_core::{Child, ChildLifecycleEvent, ChildState, new_id};
use rusqlite::{OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

fn child_from_row(row: &Row<'_>) -> Result<Child, rusqlite::Error> {
    let status: String = row.get(6)?;
    Ok(Child {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        sandbox_id: row.get(3)?,
        genesis_prompt: row.get(4)?,
        funded_amount_cents: row.get(5)?,
        status: ChildState::parse(&status).unwrap_or(ChildState::Failed),
        created_at: row.get(7)?,
        last_checked: row.get(8)?,
    })
}

const CHILD_COLUMNS: &str = "id, name, address, sandbox_id, genesis_prompt, \
     funded_amount_cents, status, created_at, last_checked";

impl StateStore {
    /// Insert a child row together with its initial lifecycle event
    /// (`from_state = "none"`), atomically.
    pub fn insert_child(&self, child: &Child, reason: &str) -> Result<(), StoreError> {
        let now = automaton_core::id::now_iso();
        let event_id = new_id();
        self.run_transaction(|tx| {
            tx.execute(
                &format!(
                    "INSERT INTO children ({CHILD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    child.id,
                    child.name,
                    child.address,
                    child.sandbox_id,
                    child.genesis_prompt,
                    child.funded_amount_cents,
                    child.status.to_string(),
                    child.created_at,
                    child.last_checked,
                ],
            )?;
            tx.execute(
                r#"
                INSERT INTO child_lifecycle_events
                    (id, child_id, from_state, to_state, reason, metadata, created_at)
                VALUES (?1, ?2, 'none', ?3, ?4, 'null', ?5)
                "#,
                params![event_id, child.id, child.status.to_string(), reason, now],
            )?;
            Ok(())
        })
    }

    /// One child by id.
    pub fn get_child(&self, child_id: &str) -> Result<Option<Child>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CHILD_COLUMNS} FROM children WHERE id = ?1"),
                [child_id],
                |row| child_from_row(row),
            )
            .optional()
        })
    }

    /// All children, oldest first.
    pub fn list_children(&self) -> Result<Vec<Child>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHILD_COLUMNS} FROM children ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([], |row| child_from_row(row))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Children whose status is none of stopped/failed/cleaned_up.
    pub fn count_living_children(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT COUNT(*) FROM children
                WHERE status NOT IN ('stopped', 'failed', 'cleaned_up')
                "#,
                [],
                |row| row.get(0),
            )
        })
    }

    /// Record a lifecycle transition: update the child's status column
    /// and append the event in one transaction.
    pub fn record_child_transition(&self, event: &ChildLifecycleEvent) -> Result<(), StoreError> {
        let metadata =
            serde_json::to_string(&event.metadata).unwrap_or_else(|_| "null".into());
        self.run_transaction(|tx| {
            tx.execute(
                "UPDATE children SET status = ?2 WHERE id = ?1",
                params![event.child_id, event.to_state.to_string()],
            )?;
            tx.execute(
                r#"
                INSERT INTO child_lifecycle_events
                    (id, child_id, from_state, to_state, reason, metadata, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    event.id,
                    event.child_id,
                    event.from_state,
                    event.to_state.to_string(),
                    event.reason,
                    metadata,
                    event.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// The full event log for a child, in insertion order.
    pub fn lifecycle_events(
        &self,
        child_id: &str,
    ) -> Result<Vec<ChildLifecycleEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, child_id, from_state, to_state, reason, metadata, created_at
                FROM child_lifecycle_events
                WHERE child_id = ?1
                ORDER BY rowid
                "#,
            )?;
            let rows = stmt
                .query_map([child_id], |row| {
                    let to_state: String = row.get(3)?;
                    let metadata_raw: String = row.get(5)?;
                    Ok(ChildLifecycleEvent {
                        id: row.get(0)?,
                        child_id: row.get(1)?,
                        from_state: row.get(2)?,
                        to_state: ChildState::parse(&to_state).unwrap_or(ChildState::Failed),
                        reason: row.get(4)?,
                        metadata: safe_parse(
                            &metadata_raw,
                            serde_json::Value::Null,
                            "child_lifecycle_events.metadata",
                        ),
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Set the child's verified wallet address.
    pub fn set_child_address(&self, child_id: &str, address: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE children SET address = ?2 WHERE id = ?1",
                params![child_id, address],
            )?;
            Ok(())
        })
    }

    /// Set the child's sandbox id once provisioned.
    pub fn set_child_sandbox(&self, child_id: &str, sandbox_id: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE children SET sandbox_id = ?2 WHERE id = ?1",
                params![child_id, sandbox_id],
            )?;
            Ok(())
        })
    }

    /// Record a funding amount.
    pub fn set_child_funded(&self, child_id: &str, amount_cents: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE children SET funded_amount_cents = ?2 WHERE id = ?1",
                params![child_id, amount_cents],
            )?;
            Ok(())
        })
    }

    /// Stamp the last health probe time.
    pub fn set_child_last_checked(&self, child_id: &str, at: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE children SET last_checked = ?2 WHERE id = ?1",
                params![child_id, at],
            )?;
            Ok(())
        })
    }

    /// Delete a child and its event log, atomically. Used by pruning.
    pub fn delete_child(&self, child_id: &str) -> Result<(), StoreError> {
        self.run_transaction(|tx| {
            tx.execute(
                "DELETE FROM child_lifecycle_events WHERE child_id = ?1",
                [child_id],
            )?;
            tx.execute("DELETE FROM children WHERE id = ?1", [child_id])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(id: &str, status: ChildState) -> Child {
        Child {
            id: id.into(),
            name: format!("child-{id}"),
            address: String::new(),
            sandbox_id: String::new(),
            genesis_prompt: "serve".into(),
            funded_amount_cents: 0,
            status,
            created_at: automaton_core::id::now_iso(),
            last_checked: None,
        }
    }

    #[test]
    fn insert_writes_the_genesis_event() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .insert_child(&child("C1", ChildState::Requested), "spawn requested")
            .unwrap();

        let events = store.lifecycle_events("C1").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_state, "none");
        assert_eq!(events[0].to_state, ChildState::Requested);
    }

    #[test]
    fn transition_updates_status_and_appends() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .insert_child(&child("C1", ChildState::Requested), "spawn requested")
            .unwrap();

        store
            .record_child_transition(&ChildLifecycleEvent {
                id: new_id(),
                child_id: "C1".into(),
                from_state: "requested".into(),
                to_state: ChildState::SandboxCreated,
                reason: "sandbox up".into(),
                metadata: serde_json::json!({"sandbox_id": "sbx-9"}),
                created_at: automaton_core::id::now_iso(),
            })
            .unwrap();

        let read = store.get_child("C1").unwrap().unwrap();
        assert_eq!(read.status, ChildState::SandboxCreated);
        assert_eq!(store.lifecycle_events("C1").unwrap().len(), 2);
    }

    #[test]
    fn living_children_excludes_terminal_states() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .insert_child(&child("C1", ChildState::Requested), "r")
            .unwrap();
        store
            .insert_child(&child("C2", ChildState::Failed), "r")
            .unwrap();
        store
            .insert_child(&child("C3", ChildState::Stopped), "r")
            .unwrap();
        assert_eq!(store.count_living_children().unwrap(), 1);
    }

    #[test]
    fn delete_removes_events_too() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .insert_child(&child("C1", ChildState::Requested), "r")
            .unwrap();
        store.delete_child("C1").unwrap();
        assert!(store.get_child("C1").unwrap().is_none());
        assert!(store.lifecycle_events("C1").unwrap().is_empty());
    }
}
