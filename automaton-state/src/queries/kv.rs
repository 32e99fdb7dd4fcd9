//! Key-value rows: agent state, sleep window, distress marker, cursors.

use rusqlite::{OptionalExtension, params};

use crate::error::StoreError;
use crate::store::StateStore;

impl StateStore {
    /// Upsert a kv row.
    pub fn set_kv(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = automaton_core::id::now_iso();
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
                "#,
                params![key, value, now],
            )?;
            Ok(())
        })
    }

    /// Read a kv row.
    pub fn get_kv(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Delete a kv row. Missing keys are fine.
    pub fn delete_kv(&self, key: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::store::StateStore;

    #[test]
    fn kv_round_trip_and_overwrite() {
        let store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.get_kv("agent_state").unwrap(), None);

        store.set_kv("agent_state", "waking").unwrap();
        assert_eq!(store.get_kv("agent_state").unwrap().unwrap(), "waking");

        store.set_kv("agent_state", "running").unwrap();
        assert_eq!(store.get_kv("agent_state").unwrap().unwrap(), "running");

        store.delete_kv("agent_state").unwrap();
        assert_eq!(store.get_kv("agent_state").unwrap(), None);
    }
}
