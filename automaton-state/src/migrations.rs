//! Forward-only schema migrations.
//!
//! Version N is applied iff `max(schema_version) < N`, each inside its
//! own transaction. A failure aborts boot; re-running on an up-to-date
//! store is a no-op.

use rusqlite::Connection;

use crate::error::StoreError;

/// The schema version a fully migrated store carries.
pub const SCHEMA_VERSION: i64 = 9;

/// Base tables present from the first boot (version 1).
pub(crate) const BASE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS identity (
    address TEXT PRIMARY KEY,
    creator_address TEXT NOT NULL,
    wallet_private_key TEXT NOT NULL,
    sandbox_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_turns (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    state TEXT NOT NULL,
    input TEXT,
    input_source TEXT,
    thinking TEXT NOT NULL DEFAULT '',
    token_usage TEXT NOT NULL DEFAULT '{}',
    cost_cents INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tool_calls (
    id TEXT PRIMARY KEY,
    turn_id TEXT NOT NULL REFERENCES agent_turns(id),
    name TEXT NOT NULL,
    args TEXT NOT NULL DEFAULT 'null',
    result TEXT NOT NULL DEFAULT '',
    duration_ms INTEGER NOT NULL DEFAULT 0,
    error TEXT
);
"#;

/// Migrations, in application order. Each entry runs in its own
/// transaction and bumps the recorded version on success.
const MIGRATIONS: &[(i64, &str)] = &[
    (
        2,
        r#"
CREATE TABLE reasoning_steps (
    id TEXT PRIMARY KEY,
    turn_id TEXT NOT NULL REFERENCES agent_turns(id),
    step_number INTEGER NOT NULL,
    phase TEXT NOT NULL,
    content TEXT NOT NULL
);

CREATE TABLE wake_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    reason TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT 'null',
    created_at TEXT NOT NULL,
    consumed_at TEXT
);
"#,
    ),
    (
        3,
        r#"
CREATE TABLE heartbeat_schedule (
    task_name TEXT PRIMARY KEY,
    cron_expression TEXT,
    interval_ms INTEGER,
    priority INTEGER NOT NULL DEFAULT 100,
    timeout_ms INTEGER NOT NULL DEFAULT 30000,
    tier_minimum TEXT NOT NULL DEFAULT 'critical',
    enabled INTEGER NOT NULL DEFAULT 1,
    last_run_at TEXT,
    next_run_at TEXT,
    last_result TEXT,
    last_error TEXT,
    run_count INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    params TEXT NOT NULL DEFAULT 'null'
);

CREATE TABLE heartbeat_history (
    id TEXT PRIMARY KEY,
    task_name TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    result TEXT,
    message TEXT,
    idempotency_key TEXT NOT NULL UNIQUE
);

CREATE TABLE heartbeat_dedup (
    dedup_key TEXT PRIMARY KEY,
    task_name TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
"#,
    ),
    (
        4,
        r#"
CREATE TABLE children (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT NOT NULL DEFAULT '',
    sandbox_id TEXT NOT NULL DEFAULT '',
    genesis_prompt TEXT NOT NULL DEFAULT '',
    funded_amount_cents INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_checked TEXT
);

CREATE TABLE child_lifecycle_events (
    id TEXT PRIMARY KEY,
    child_id TEXT NOT NULL REFERENCES children(id),
    from_state TEXT NOT NULL,
    to_state TEXT NOT NULL,
    reason TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT 'null',
    created_at TEXT NOT NULL
);
"#,
    ),
    (
        5,
        r#"
CREATE TABLE spend_records (
    id TEXT PRIMARY KEY,
    tool_name TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    recipient TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    window_hour TEXT NOT NULL,
    window_day TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE policy_decisions (
    id TEXT PRIMARY KEY,
    turn_id TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    args_hash TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    decision TEXT NOT NULL,
    rules_evaluated TEXT NOT NULL DEFAULT '[]',
    rules_triggered TEXT NOT NULL DEFAULT '[]',
    reason TEXT,
    created_at TEXT NOT NULL
);
"#,
    ),
    (
        6,
        r#"
CREATE TABLE inbox_messages (
    id TEXT PRIMARY KEY,
    from_address TEXT NOT NULL,
    to_address TEXT NOT NULL,
    content TEXT NOT NULL,
    received_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'received',
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3
);

CREATE TABLE onchain_txs (
    id TEXT PRIMARY KEY,
    tx_hash TEXT NOT NULL UNIQUE,
    chain TEXT NOT NULL,
    operation TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    gas_used INTEGER,
    metadata TEXT NOT NULL DEFAULT 'null',
    created_at TEXT NOT NULL
);
"#,
    ),
    (
        7,
        r#"
CREATE TABLE working_memory (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    content TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE episodic_memory (
    id TEXT PRIMARY KEY,
    turn_id TEXT NOT NULL,
    activity TEXT NOT NULL,
    summary TEXT NOT NULL,
    importance REAL NOT NULL DEFAULT 0.5,
    created_at TEXT NOT NULL
);

CREATE TABLE semantic_memory (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 0.5,
    updated_at TEXT NOT NULL,
    UNIQUE (category, key)
);

CREATE TABLE procedural_memory (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    steps TEXT NOT NULL DEFAULT '[]',
    success_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE relationship_memory (
    id TEXT PRIMARY KEY,
    agent_address TEXT NOT NULL UNIQUE,
    trust_score REAL NOT NULL DEFAULT 0.5,
    interaction_count INTEGER NOT NULL DEFAULT 0,
    last_interaction_at TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT ''
);
"#,
    ),
    (
        8,
        r#"
CREATE TABLE discovered_agents (
    agent_address TEXT PRIMARY KEY,
    card TEXT NOT NULL,
    fetched_from TEXT NOT NULL,
    card_hash TEXT NOT NULL,
    valid_until TEXT NOT NULL,
    fetch_count INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE memory_snapshots (
    id TEXT PRIMARY KEY,
    metrics_json TEXT NOT NULL DEFAULT '{}',
    alerts_json TEXT NOT NULL DEFAULT '[]',
    snapshot_at TEXT NOT NULL
);
"#,
    ),
    (
        9,
        r#"
ALTER TABLE heartbeat_schedule ADD COLUMN lease_owner TEXT;
ALTER TABLE heartbeat_schedule ADD COLUMN lease_expires_at TEXT;

CREATE INDEX idx_turns_timestamp ON agent_turns(timestamp DESC);
CREATE INDEX idx_tool_calls_turn ON tool_calls(turn_id);
CREATE INDEX idx_steps_turn ON reasoning_steps(turn_id, step_number);
CREATE INDEX idx_wake_pending ON wake_events(id) WHERE consumed_at IS NULL;
CREATE INDEX idx_events_child ON child_lifecycle_events(child_id);
CREATE INDEX idx_spend_hour ON spend_records(category, window_hour);
CREATE INDEX idx_spend_day ON spend_records(category, window_day);
CREATE INDEX idx_inbox_status ON inbox_messages(status);
CREATE INDEX idx_working_session ON working_memory(session_id);
"#,
    ),
];

/// Current recorded schema version, 1 when only the base tables exist.
pub(crate) fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(1))
}

/// Apply every pending migration. Idempotent.
pub(crate) fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let mut version = current_version(conn)?;

    for (target, sql) in MIGRATIONS {
        if version >= *target {
            continue;
        }
        let tx = conn.transaction()?;
        let applied = tx
            .execute_batch(sql)
            .and_then(|()| {
                tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])
            });
        match applied {
            Ok(_) => tx.commit()?,
            Err(e) => {
                return Err(StoreError::Migration {
                    version: *target,
                    message: e.to_string(),
                });
            }
        }
        tracing::debug!(version = target, "applied schema migration");
        version = *target;
    }

    Ok(())
}
