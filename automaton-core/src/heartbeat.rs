//! Heartbeat schedule, history, dedup, and wake-event records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::SurvivalTier;

/// One row per task in `heartbeat_schedule`, upserted from config on boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSchedule {
    /// Unique task name (e.g. `check_credits`).
    pub task_name: String,
    /// Cron expression (5-field). Wins over `interval_ms` when both are set.
    pub cron_expression: Option<String>,
    /// Plain interval in milliseconds; fallback when no cron parses.
    pub interval_ms: Option<i64>,
    /// Execution order within a tick, ascending.
    pub priority: i64,
    /// Per-execution timeout.
    pub timeout_ms: u64,
    /// Lowest survival tier at which the task still runs.
    pub tier_minimum: SurvivalTier,
    /// Disabled tasks are skipped entirely.
    pub enabled: bool,
    /// ISO-8601 of the last attempt, if any.
    pub last_run_at: Option<String>,
    /// ISO-8601 of the next due time.
    pub next_run_at: Option<String>,
    /// Result string of the last attempt.
    pub last_result: Option<String>,
    /// Error message of the last failure.
    pub last_error: Option<String>,
    /// Total attempts.
    pub run_count: i64,
    /// Attempts that did not end in success.
    pub fail_count: i64,
    /// Owner of the current lease, if held.
    pub lease_owner: Option<String>,
    /// ISO-8601 expiry of the current lease.
    pub lease_expires_at: Option<String>,
    /// Free-form task parameters from the schedule file.
    pub params: serde_json::Value,
}

/// Outcome classification for a heartbeat execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    /// Ran and returned.
    Success,
    /// Ran and errored.
    Failure,
    /// Exceeded its `timeout_ms`.
    Timeout,
    /// Dedup key already present; not run.
    Skipped,
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

impl TaskResult {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "timeout" => Some(Self::Timeout),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Append-only record of one heartbeat execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatHistoryRow {
    /// ULID.
    pub id: String,
    /// Which task ran.
    pub task_name: String,
    /// ISO-8601 start.
    pub started_at: String,
    /// ISO-8601 completion; `None` while in flight.
    pub completed_at: Option<String>,
    /// Outcome; `None` while in flight.
    pub result: Option<TaskResult>,
    /// Message the task returned, or the error text.
    pub message: Option<String>,
    /// Unique key that short-circuits identical work within its TTL.
    pub idempotency_key: String,
}

/// A queued signal that the turn loop should consume input and run.
///
/// FIFO by `id` (SQLite rowid); consumed at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeEvent {
    /// Monotonic insertion id.
    pub id: i64,
    /// Producer (`heartbeat`, `inbox`, `manual`...).
    pub source: String,
    /// Why the producer wants the agent awake.
    pub reason: String,
    /// Free-form payload handed to the turn loop.
    pub payload: serde_json::Value,
    /// ISO-8601 insertion time.
    pub created_at: String,
    /// ISO-8601 consumption time; `None` while pending.
    pub consumed_at: Option<String>,
}
