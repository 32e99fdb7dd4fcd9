//! Heartbeat schedule, history, and dedup rows.

use automaton_core::{HeartbeatHistoryRow, HeartbeatSchedule, SurvivalTier, TaskResult};
use rusqlite::{OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::store::{StateStore, safe_parse};

fn schedule_from_row(row: &Row<'_>) -> Result<HeartbeatSchedule, rusqlite::Error> {
    let tier: String = row.get(5)?;
    let timeout: i64 = row.get(4)?;
    let params_raw: String = row.get(13)?;
    Ok(HeartbeatSchedule {
        task_name: row.get(0)?,
        cron_expression: row.get(1)?,
        interval_ms: row.get(2)?,
        priority: row.get(3)?,
        timeout_ms: timeout.max(0) as u64,
        tier_minimum: SurvivalTier::parse(&tier).unwrap_or(SurvivalTier::Critical),
        enabled: row.get(6)?,
        last_run_at: row.get(7)?,
        next_run_at: row.get(8)?,
        last_result: row.get(9)?,
        last_error: row.get(10)?,
        run_count: row.get(11)?,
        fail_count: row.get(12)?,
        lease_owner: row.get(14)?,
        lease_expires_at: row.get(15)?,
        params: safe_parse(
            &params_raw,
            serde_json::Value::Null,
            "heartbeat_schedule.params",
        ),
    })
}

const SCHEDULE_COLUMNS: &str = "task_name, cron_expression, interval_ms, priority, timeout_ms, \
     tier_minimum, enabled, last_run_at, next_run_at, last_result, last_error, \
     run_count, fail_count, params, lease_owner, lease_expires_at";

impl StateStore {
    /// Upsert a schedule row from config, preserving run-time fields
    /// (counters, lease, last/next run) on existing rows.
    pub fn upsert_schedule(&self, row: &HeartbeatSchedule) -> Result<(), StoreError> {
        let params_json =
            serde_json::to_string(&row.params).unwrap_or_else(|_| "null".into());
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO heartbeat_schedule
                    (task_name, cron_expression, interval_ms, priority, timeout_ms,
                     tier_minimum, enabled, params)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(task_name) DO UPDATE SET
                    cron_expression = ?2,
                    interval_ms = ?3,
                    priority = ?4,
                    timeout_ms = ?5,
                    tier_minimum = ?6,
                    enabled = ?7,
                    params = ?8
                "#,
                params![
                    row.task_name,
                    row.cron_expression,
                    row.interval_ms,
                    row.priority,
                    row.timeout_ms as i64,
                    row.tier_minimum.to_string(),
                    row.enabled,
                    params_json,
                ],
            )?;
            Ok(())
        })
    }

    /// All schedule rows, priority ascending.
    pub fn list_schedules(&self) -> Result<Vec<HeartbeatSchedule>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM heartbeat_schedule ORDER BY priority, task_name"
            ))?;
            let rows = stmt
                .query_map([], |row| schedule_from_row(row))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One schedule row by task name.
    pub fn get_schedule(&self, task_name: &str) -> Result<Option<HeartbeatSchedule>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM heartbeat_schedule WHERE task_name = ?1"),
                [task_name],
                |row| schedule_from_row(row),
            )
            .optional()
        })
    }

    /// Compare-and-swap lease acquisition: succeeds only when the row has
    /// no owner or the existing lease has expired.
    pub fn try_acquire_lease(
        &self,
        task_name: &str,
        owner: &str,
        expires_at: &str,
        now: &str,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                r#"
                UPDATE heartbeat_schedule
                SET lease_owner = ?1, lease_expires_at = ?2
                WHERE task_name = ?3
                  AND (lease_owner IS NULL OR lease_expires_at < ?4)
                "#,
                params![owner, expires_at, task_name, now],
            )?;
            Ok(affected == 1)
        })
    }

    /// Release a lease, but only if `owner` still holds it.
    pub fn release_lease(&self, task_name: &str, owner: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE heartbeat_schedule
                SET lease_owner = NULL, lease_expires_at = NULL
                WHERE task_name = ?1 AND lease_owner = ?2
                "#,
                params![task_name, owner],
            )?;
            Ok(())
        })
    }

    /// Drop every lease whose expiry is in the past.
    pub fn clear_expired_leases(&self, now: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                r#"
                UPDATE heartbeat_schedule
                SET lease_owner = NULL, lease_expires_at = NULL
                WHERE lease_expires_at IS NOT NULL AND lease_expires_at < ?1
                "#,
                [now],
            )?;
            Ok(affected)
        })
    }

    /// Record the outcome of an execution on the schedule row.
    pub fn update_schedule_after_run(
        &self,
        task_name: &str,
        last_run_at: &str,
        next_run_at: &str,
        result: TaskResult,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let failed = !matches!(result, TaskResult::Success | TaskResult::Skipped);
        self.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE heartbeat_schedule
                SET last_run_at = ?2,
                    next_run_at = ?3,
                    last_result = ?4,
                    last_error = ?5,
                    run_count = run_count + 1,
                    fail_count = fail_count + ?6
                WHERE task_name = ?1
                "#,
                params![
                    task_name,
                    last_run_at,
                    next_run_at,
                    result.to_string(),
                    error,
                    failed as i64,
                ],
            )?;
            Ok(())
        })
    }

    /// Insert the start row for an execution.
    pub fn insert_history_start(&self, row: &HeartbeatHistoryRow) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO heartbeat_history
                    (id, task_name, started_at, completed_at, result, message, idempotency_key)
                VALUES (?1, ?2, ?3, NULL, NULL, NULL, ?4)
                "#,
                params![row.id, row.task_name, row.started_at, row.idempotency_key],
            )?;
            Ok(())
        })
    }

    /// Complete a history row with its outcome.
    pub fn complete_history(
        &self,
        id: &str,
        completed_at: &str,
        result: TaskResult,
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE heartbeat_history
                SET completed_at = ?2, result = ?3, message = ?4
                WHERE id = ?1
                "#,
                params![id, completed_at, result.to_string(), message],
            )?;
            Ok(())
        })
    }

    /// Recent history rows for a task, newest first.
    pub fn history_for_task(
        &self,
        task_name: &str,
        limit: usize,
    ) -> Result<Vec<HeartbeatHistoryRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, task_name, started_at, completed_at, result, message, idempotency_key
                FROM heartbeat_history
                WHERE task_name = ?1
                ORDER BY started_at DESC
                LIMIT ?2
                "#,
            )?;
            let rows = stmt
                .query_map(params![task_name, limit as i64], |row| {
                    let result: Option<String> = row.get(4)?;
                    Ok(HeartbeatHistoryRow {
                        id: row.get(0)?,
                        task_name: row.get(1)?,
                        started_at: row.get(2)?,
                        completed_at: row.get(3)?,
                        result: result.as_deref().and_then(TaskResult::parse),
                        message: row.get(5)?,
                        idempotency_key: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Insert a dedup key with its TTL.
    pub fn insert_dedup(
        &self,
        dedup_key: &str,
        task_name: &str,
        expires_at: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO heartbeat_dedup (dedup_key, task_name, expires_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(dedup_key) DO UPDATE SET expires_at = ?3
                "#,
                params![dedup_key, task_name, expires_at],
            )?;
            Ok(())
        })
    }

    /// Whether an unexpired dedup key exists.
    pub fn dedup_exists(&self, dedup_key: &str, now: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM heartbeat_dedup WHERE dedup_key = ?1 AND expires_at >= ?2",
                params![dedup_key, now],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Lazily prune expired dedup keys.
    pub fn prune_dedup(&self, now: &str) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let affected =
                conn.execute("DELETE FROM heartbeat_dedup WHERE expires_at < ?1", [now])?;
            Ok(affected)
        })
    }
}
