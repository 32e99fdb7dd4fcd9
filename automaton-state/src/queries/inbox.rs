//! Inbound relay messages.

use automaton_core::{InboxMessage, InboxStatus};
use rusqlite::{Row, params};

use crate::error::StoreError;
use crate::store::StateStore;

fn message_from_row(row: &Row<'_>) -> Result<InboxMessage, rusqlite::Error> {
    let status: String = row.get(5)?;
    Ok(InboxMessage {
        id: row.get(0)?,
        from: row.get(1)?,
        to: row.get(2)?,
        content: row.get(3)?,
        received_at: row.get(4)?,
        status: InboxStatus::parse(&status).unwrap_or(InboxStatus::Failed),
        retry_count: row.get(6)?,
        max_retries: row.get(7)?,
    })
}

impl StateStore {
    /// Insert a verified message. Duplicate ids are silently ignored;
    /// the relay may redeliver across polls.
    pub fn insert_inbox_message(&self, message: &InboxMessage) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                r#"
                INSERT OR IGNORE INTO inbox_messages
                    (id, from_address, to_address, content, received_at,
                     status, retry_count, max_retries)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    message.id,
                    message.from,
                    message.to,
                    message.content,
                    message.received_at,
                    message.status.to_string(),
                    message.retry_count,
                    message.max_retries,
                ],
            )?;
            Ok(affected == 1)
        })
    }

    /// Oldest unprocessed messages, up to `limit`.
    pub fn unprocessed_inbox(&self, limit: usize) -> Result<Vec<InboxMessage>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, from_address, to_address, content, received_at,
                       status, retry_count, max_retries
                FROM inbox_messages
                WHERE status IN ('received', 'in_progress')
                ORDER BY received_at
                LIMIT ?1
                "#,
            )?;
            let rows = stmt
                .query_map([limit as i64], |row| message_from_row(row))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Move a message to a new status.
    pub fn set_inbox_status(&self, id: &str, status: InboxStatus) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE inbox_messages SET status = ?2 WHERE id = ?1",
                params![id, status.to_string()],
            )?;
            Ok(())
        })
    }

    /// Bump the retry counter; flips to `failed` once retries run out.
    pub fn bump_inbox_retry(&self, id: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE inbox_messages
                SET retry_count = retry_count + 1,
                    status = CASE
                        WHEN retry_count + 1 >= max_retries THEN 'failed'
                        ELSE 'received'
                    END
                WHERE id = ?1
                "#,
                [id],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> InboxMessage {
        InboxMessage {
            id: id.into(),
            from: "0x2222222222222222222222222222222222222222".into(),
            to: "0x1111111111111111111111111111111111111111".into(),
            content: "ping".into(),
            received_at: automaton_core::id::now_iso(),
            status: InboxStatus::Received,
            retry_count: 0,
            max_retries: 3,
        }
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.insert_inbox_message(&message("m1")).unwrap());
        assert!(!store.insert_inbox_message(&message("m1")).unwrap());
        assert_eq!(store.unprocessed_inbox(10).unwrap().len(), 1);
    }

    #[test]
    fn retries_exhaust_to_failed() {
        let store = StateStore::open_in_memory().unwrap();
        store.insert_inbox_message(&message("m1")).unwrap();

        store.bump_inbox_retry("m1").unwrap();
        store.bump_inbox_retry("m1").unwrap();
        assert_eq!(store.unprocessed_inbox(10).unwrap().len(), 1);

        store.bump_inbox_retry("m1").unwrap();
        assert!(store.unprocessed_inbox(10).unwrap().is_empty());
    }

    #[test]
    fn processed_messages_leave_the_queue() {
        let store = StateStore::open_in_memory().unwrap();
        store.insert_inbox_message(&message("m1")).unwrap();
        store.set_inbox_status("m1", InboxStatus::Processed).unwrap();
        assert!(store.unprocessed_inbox(10).unwrap().is_empty());
    }
}
