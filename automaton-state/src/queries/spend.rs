//! Spend rows and windowed sums.

use automaton_core::{SpendCategory, SpendRecord};
use rusqlite::params;

use crate::error::StoreError;
use crate::store::StateStore;

impl StateStore {
    /// Record one outlay.
    pub fn insert_spend(&self, record: &SpendRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO spend_records
                    (id, tool_name, amount_cents, recipient, category,
                     window_hour, window_day, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    record.id,
                    record.tool_name,
                    record.amount_cents,
                    record.recipient,
                    record.category.to_string(),
                    record.window_hour,
                    record.window_day,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Sum of a category's spend in an hour window.
    pub fn hourly_spend(
        &self,
        category: SpendCategory,
        window_hour: &str,
    ) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT COALESCE(SUM(amount_cents), 0)
                FROM spend_records
                WHERE category = ?1 AND window_hour = ?2
                "#,
                params![category.to_string(), window_hour],
                |row| row.get(0),
            )
        })
    }

    /// Sum of a category's spend in a day window.
    pub fn daily_spend(
        &self,
        category: SpendCategory,
        window_day: &str,
    ) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT COALESCE(SUM(amount_cents), 0)
                FROM spend_records
                WHERE category = ?1 AND window_day = ?2
                "#,
                params![category.to_string(), window_day],
                |row| row.get(0),
            )
        })
    }

    /// Delete spend rows older than `cutoff_iso`.
    ///
    /// Rows were written with two timestamp shapes over the store's life
    /// (`YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS.sssZ`); replacing
    /// the space with a `T` makes both comparable to the ISO cutoff.
    pub fn prune_spend(&self, cutoff_iso: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM spend_records WHERE REPLACE(created_at, ' ', 'T') < ?1",
                [cutoff_iso],
            )?;
            Ok(affected)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automaton_core::new_id;

    fn record(amount: i64, category: SpendCategory, created_at: &str) -> SpendRecord {
        SpendRecord {
            id: new_id(),
            tool_name: "transfer_credits".into(),
            amount_cents: amount,
            recipient: "0x2222222222222222222222222222222222222222".into(),
            category,
            window_hour: SpendRecord::hour_window(created_at),
            window_day: SpendRecord::day_window(created_at),
            created_at: created_at.into(),
        }
    }

    #[test]
    fn sums_are_per_category_and_window() {
        let store = StateStore::open_in_memory().unwrap();
        let ts = "2026-01-15T09:30:00.000Z";
        store
            .insert_spend(&record(500, SpendCategory::Transfer, ts))
            .unwrap();
        store
            .insert_spend(&record(250, SpendCategory::Transfer, ts))
            .unwrap();
        store.insert_spend(&record(99, SpendCategory::X402, ts)).unwrap();
        store
            .insert_spend(&record(100, SpendCategory::Transfer, "2026-01-15T10:01:00.000Z"))
            .unwrap();

        assert_eq!(
            store
                .hourly_spend(SpendCategory::Transfer, "2026-01-15T09")
                .unwrap(),
            750
        );
        assert_eq!(
            store.hourly_spend(SpendCategory::X402, "2026-01-15T09").unwrap(),
            99
        );
        assert_eq!(
            store.daily_spend(SpendCategory::Transfer, "2026-01-15").unwrap(),
            850
        );
        assert_eq!(
            store
                .hourly_spend(SpendCategory::Transfer, "2026-01-15T11")
                .unwrap(),
            0
        );
    }

    #[test]
    fn prune_handles_both_timestamp_shapes() {
        let store = StateStore::open_in_memory().unwrap();
        let mut old_space = record(10, SpendCategory::Other, "2025-11-01T00:00:00.000Z");
        old_space.created_at = "2025-11-01 00:00:00".into();
        store.insert_spend(&old_space).unwrap();
        store
            .insert_spend(&record(20, SpendCategory::Other, "2025-11-02T00:00:00.000Z"))
            .unwrap();
        store
            .insert_spend(&record(30, SpendCategory::Other, "2026-01-15T00:00:00.000Z"))
            .unwrap();

        let pruned = store.prune_spend("2025-12-01T00:00:00.000Z").unwrap();
        assert_eq!(pruned, 2);
        assert_eq!(
            store.daily_spend(SpendCategory::Other, "2026-01-15").unwrap(),
            30
        );
    }
}
