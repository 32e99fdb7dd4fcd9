//! The singleton identity row.

use automaton_core::Identity;
use rusqlite::{OptionalExtension, params};

use crate::error::StoreError;
use crate::store::StateStore;

impl StateStore {
    /// Write the identity. Exists exactly once; a second write is a
    /// conflict, never an overwrite.
    pub fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let existing = self.get_identity()?;
        if existing.is_some() {
            return Err(StoreError::Conflict(
                "identity already bootstrapped".into(),
            ));
        }
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO identity
                    (address, creator_address, wallet_private_key, sandbox_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    identity.address,
                    identity.creator_address,
                    identity.wallet_private_key,
                    identity.sandbox_id,
                    identity.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Read the identity, if bootstrapped.
    pub fn get_identity(&self) -> Result<Option<Identity>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT address, creator_address, wallet_private_key, sandbox_id, created_at
                FROM identity LIMIT 1
                "#,
                [],
                |row| {
                    Ok(Identity {
                        address: row.get(0)?,
                        creator_address: row.get(1)?,
                        wallet_private_key: row.get(2)?,
                        sandbox_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }
}
