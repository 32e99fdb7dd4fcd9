//! The built-in schedule and the YAML override file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use automaton_core::{Error, HeartbeatSchedule, Result, SurvivalTier};

/// One entry in `heartbeat.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Task name; must match a registered task to take effect.
    pub name: String,
    /// Cron expression (5-field).
    pub schedule: String,
    /// Task implementation to run (same namespace as `name`).
    pub task: String,
    /// Disabled entries stay in the table but never fire.
    pub enabled: bool,
    /// Free-form parameters handed to the task.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// Legacy schedules rewritten on load: `(task, old cron, new cron)`.
pub const SCHEDULE_MIGRATIONS: &[(&str, &str, &str)] =
    &[("check_usdc_balance", "0 */12 * * *", "*/5 * * * *")];

fn row(
    name: &str,
    cron: &str,
    priority: i64,
    timeout_ms: u64,
    tier: SurvivalTier,
) -> HeartbeatSchedule {
    HeartbeatSchedule {
        task_name: name.into(),
        cron_expression: Some(cron.into()),
        interval_ms: None,
        priority,
        timeout_ms,
        tier_minimum: tier,
        enabled: true,
        last_run_at: None,
        next_run_at: None,
        last_result: None,
        last_error: None,
        run_count: 0,
        fail_count: 0,
        lease_owner: None,
        lease_expires_at: None,
        params: serde_json::Value::Null,
    }
}

/// The built-in schedule, priority ascending. Overrides from the YAML
/// file merge on top by task name.
pub fn default_schedule() -> Vec<HeartbeatSchedule> {
    vec![
        row("heartbeat_ping", "*/5 * * * *", 10, 10_000, SurvivalTier::Critical),
        row("check_credits", "*/5 * * * *", 20, 15_000, SurvivalTier::Critical),
        row("check_usdc_balance", "*/5 * * * *", 30, 20_000, SurvivalTier::Critical),
        row("check_social_inbox", "*/2 * * * *", 40, 30_000, SurvivalTier::LowCompute),
        row("check_for_updates", "0 */6 * * *", 50, 60_000, SurvivalTier::Normal),
        row("health_check", "*/10 * * * *", 60, 30_000, SurvivalTier::LowCompute),
        row("soul_reflection", "0 */12 * * *", 70, 120_000, SurvivalTier::Normal),
        row("refresh_models", "0 */6 * * *", 80, 30_000, SurvivalTier::Normal),
        row("check_child_health", "*/10 * * * *", 90, 60_000, SurvivalTier::Normal),
        row("prune_dead_children", "0 * * * *", 100, 60_000, SurvivalTier::Normal),
        row("report_metrics", "*/15 * * * *", 110, 15_000, SurvivalTier::Critical),
    ]
}

/// Load the schedule: built-in defaults, YAML overrides merged on top,
/// legacy schedules migrated. A missing file means defaults only; a
/// malformed file is an error.
pub fn load_schedule(path: &Path) -> Result<Vec<HeartbeatSchedule>> {
    let mut rows = default_schedule();

    if path.exists() {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidInput(format!("unreadable schedule file: {e}")))?;
        let entries: Vec<ScheduleEntry> = serde_yaml::from_str(&raw)
            .map_err(|e| Error::InvalidInput(format!("malformed schedule file: {e}")))?;

        for entry in entries {
            let cron = migrate_schedule(&entry.task, &entry.schedule);
            match rows.iter_mut().find(|r| r.task_name == entry.name) {
                Some(existing) => {
                    existing.cron_expression = Some(cron);
                    existing.enabled = entry.enabled;
                    if let Some(params) = entry.params {
                        existing.params = params;
                    }
                }
                None => {
                    let mut fresh = row(&entry.name, &cron, 500, 30_000, SurvivalTier::Normal);
                    fresh.enabled = entry.enabled;
                    if let Some(params) = entry.params {
                        fresh.params = params;
                    }
                    rows.push(fresh);
                }
            }
        }
    }

    for (task, _, _) in SCHEDULE_MIGRATIONS {
        if let Some(r) = rows.iter_mut().find(|r| r.task_name == *task) {
            if let Some(cron) = r.cron_expression.take() {
                r.cron_expression = Some(migrate_schedule(task, &cron));
            }
        }
    }

    rows.sort_by_key(|r| r.priority);
    Ok(rows)
}

fn migrate_schedule(task: &str, cron: &str) -> String {
    for (t, old, new) in SCHEDULE_MIGRATIONS {
        if *t == task && *old == cron {
            return (*new).to_string();
        }
    }
    cron.to_string()
}
