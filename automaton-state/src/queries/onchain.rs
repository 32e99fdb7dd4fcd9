//! Tracked on-chain transactions.

use automaton_core::message::{OnchainTx, TxStatus};
use rusqlite::{OptionalExtension, params};

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

impl StateStore {
    /// Record a submitted transaction. `tx_hash` is unique.
    pub fn insert_onchain_tx(&self, tx: &OnchainTx) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&tx.metadata).unwrap_or_else(|_| "null".into());
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO onchain_txs
                    (id, tx_hash, chain, operation, status, gas_used, metadata, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    tx.id,
                    tx.tx_hash,
                    tx.chain,
                    tx.operation,
                    tx.status.to_string(),
                    tx.gas_used,
                    metadata,
                    tx.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Update status and gas once a receipt lands.
    pub fn update_onchain_status(
        &self,
        tx_hash: &str,
        status: TxStatus,
        gas_used: Option<i64>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE onchain_txs SET status = ?2, gas_used = ?3 WHERE tx_hash = ?1",
                params![tx_hash, status.to_string(), gas_used],
            )?;
            Ok(())
        })
    }

    /// Look up a transaction by hash.
    pub fn get_onchain_tx(&self, tx_hash: &str) -> Result<Option<OnchainTx>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT id, tx_hash, chain, operation, status, gas_used, metadata, created_at
                FROM onchain_txs WHERE tx_hash = ?1
                "#,
                [tx_hash],
                |row| {
                    let status: String = row.get(4)?;
                    let metadata_raw: String = row.get(6)?;
                    Ok(OnchainTx {
                        id: row.get(0)?,
                        tx_hash: row.get(1)?,
                        chain: row.get(2)?,
                        operation: row.get(3)?,
                        status: TxStatus::parse(&status).unwrap_or(TxStatus::Failed),
                        gas_used: row.get(5)?,
                        metadata: safe_parse(
                            &metadata_raw,
                            serde_json::Value::Null,
                            "onchain_txs.metadata",
                        ),
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Hashes still awaiting receipts.
    pub fn pending_onchain_hashes(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT tx_hash FROM onchain_txs WHERE status = 'pending'")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
