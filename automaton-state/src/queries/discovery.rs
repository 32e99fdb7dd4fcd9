//! Discovered-agent card cache.

use automaton_core::message::DiscoveredAgent;
use rusqlite::{OptionalExtension, params};

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

impl StateStore {
    /// Upsert a fetched card, bumping the fetch count on refresh.
    pub fn upsert_discovered_agent(&self, agent: &DiscoveredAgent) -> Result<(), StoreError> {
        let card = serde_json::to_string(&agent.card).unwrap_or_else(|_| "null".into());
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO discovered_agents
                    (agent_address, card, fetched_from, card_hash, valid_until, fetch_count)
                VALUES (?1, ?2, ?3, ?4, ?5, 1)
                ON CONFLICT(agent_address) DO UPDATE SET
                    card = ?2,
                    fetched_from = ?3,
                    card_hash = ?4,
                    valid_until = ?5,
                    fetch_count = fetch_count + 1
                "#,
                params![
                    agent.agent_address,
                    card,
                    agent.fetched_from,
                    agent.card_hash,
                    agent.valid_until,
                ],
            )?;
            Ok(())
        })
    }

    /// A cached card, only while still fresh. Stale entries never
    /// satisfy queries.
    pub fn get_discovered_agent(
        &self,
        agent_address: &str,
        now: &str,
    ) -> Result<Option<DiscoveredAgent>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT agent_address, card, fetched_from, card_hash, valid_until, fetch_count
                FROM discovered_agents
                WHERE agent_address = ?1 AND valid_until >= ?2
                "#,
                params![agent_address, now],
                |row| {
                    let card_raw: String = row.get(1)?;
                    Ok(DiscoveredAgent {
                        agent_address: row.get(0)?,
                        card: safe_parse(
                            &card_raw,
                            serde_json::Value::Null,
                            "discovered_agents.card",
                        ),
                        fetched_from: row.get(2)?,
                        card_hash: row.get(3)?,
                        valid_until: row.get(4)?,
                        fetch_count: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Drop expired cache entries.
    pub fn prune_discovered_agents(&self, now: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM discovered_agents WHERE valid_until < ?1",
                [now],
            )?;
            Ok(affected)
        })
    }
}
