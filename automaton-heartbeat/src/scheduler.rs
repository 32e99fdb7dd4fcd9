//! The tick loop: leases, dedup, timeouts, outcomes, wake events.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use automaton_core::{
    HeartbeatHistoryRow, HeartbeatSchedule, Result, SurvivalTier, TaskResult, WakeEvent, new_id,
};
use automaton_core::id::{parse_iso, to_iso};
use automaton_observe::LogError;

use crate::context::{TickContext, TickDeps};
use crate::schedule::{approximate_period, next_run_after};

/// Kv key recording when the balance first hit zero at `critical`.
const CRITICAL_SINCE_KEY: &str = "critical_since";

/// Grace period before a zero balance turns the agent `dead`.
/// Part of the contract; never shorten it.
const DEAD_GRACE_SECS: i64 = 3600;

/// Extra time a lease outlives its task's timeout.
const LEASE_SLACK_MS: i64 = 60_000;

/// Most wake events one tick hands to the turn loop.
const WAKE_DRAIN_LIMIT: usize = 10;

/// What a task returns. Tasks never error through the scheduler; a
/// failure inside is caught and recorded.
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    /// Whether the turn loop should wake up.
    pub should_wake: bool,
    /// Message for the history row and the wake event.
    pub message: Option<String>,
}

impl TaskOutcome {
    /// An outcome that keeps the agent asleep.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// An outcome that wakes the agent with a message.
    pub fn wake(message: impl Into<String>) -> Self {
        Self {
            should_wake: true,
            message: Some(message.into()),
        }
    }
}

/// One scheduled task. Given a tick context, perform side effects and
/// report whether the agent should wake.
#[async_trait]
pub trait HeartbeatTask: Send + Sync {
    /// The schedule-table name of this task.
    fn name(&self) -> &'static str;

    /// Run once. Errors are caught by the scheduler and recorded as
    /// `failure`; they never stop the tick.
    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome>;
}

/// Summary of one tick, for logs and tests.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Tick id.
    pub tick_id: String,
    /// Tier the tick ran at.
    pub tier: Option<SurvivalTier>,
    /// Events consumed this tick, FIFO. The loop driver feeds them to
    /// the turn loop as inputs.
    pub wake_events: Vec<WakeEvent>,
    /// `(task, result)` for every attempted task.
    pub outcomes: Vec<(String, TaskResult)>,
    /// Wake events queued by tasks this tick.
    pub wakes_queued: usize,
}

/// The scheduler. Single-threaded cooperative: one tick at a time,
/// tasks sequential in priority order.
pub struct Scheduler {
    deps: TickDeps,
    tasks: HashMap<&'static str, Arc<dyn HeartbeatTask>>,
}

impl Scheduler {
    /// Scheduler over the shared dependencies with a task registry.
    pub fn new(deps: TickDeps, tasks: Vec<Arc<dyn HeartbeatTask>>) -> Self {
        let tasks = tasks.into_iter().map(|t| (t.name(), t)).collect();
        Self { deps, tasks }
    }

    /// Upsert the schedule rows (from config) into the store.
    pub fn install_schedule(&self, rows: &[HeartbeatSchedule]) -> Result<()> {
        for row in rows {
            self.deps.store.upsert_schedule(row)?;
        }
        Ok(())
    }

    /// Run one tick.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let tick_id = new_id();
        let started_at = Utc::now();

        // Balances: exactly once per tick.
        let credit_cents = match self.deps.sandbox.credits_balance().await {
            Ok(cents) => {
                self.deps
                    .store
                    .set_kv("last_credit_cents", &cents.to_string())?;
                cents
            }
            Err(e) => {
                self.deps.logger.error(
                    "heartbeat",
                    "credit balance fetch failed, using last known",
                    Some(LogError::from(&e)),
                );
                self.deps
                    .store
                    .get_kv("last_credit_cents")?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0)
            }
        };
        let usdc_balance = match self.deps.chain.usdc_balance(&self.deps.identity.address).await
        {
            Ok(balance) => balance,
            Err(e) => {
                self.deps.logger.error(
                    "heartbeat",
                    "usdc balance fetch failed",
                    Some(LogError::from(&e)),
                );
                0.0
            }
        };

        let tier = self.effective_tier(credit_cents, started_at)?;
        self.deps
            .metrics
            .set_gauge("credits_cents", credit_cents as f64, &[]);
        self.deps
            .metrics
            .set_gauge("usdc_balance", usdc_balance, &[]);
        self.deps
            .store
            .set_kv("agent_tier", &tier.to_string())?;

        let ctx = TickContext {
            tick_id: tick_id.clone(),
            started_at,
            credit_cents,
            usdc_balance,
            tier,
            deps: self.deps.clone(),
        };

        let now_iso = to_iso(started_at);
        self.deps.store.clear_expired_leases(&now_iso)?;
        self.deps.store.prune_dedup(&now_iso)?;

        let mut report = TickReport {
            tick_id: tick_id.clone(),
            tier: Some(tier),
            ..Default::default()
        };

        if tier == SurvivalTier::Dead {
            self.deps
                .logger
                .warn("heartbeat", "agent is dead; tick runs nothing");
            return Ok(report);
        }

        // Consume pending wake events FIFO, bounded. A dead tick leaves
        // them queued for a possible resurrection.
        report.wake_events = self.deps.store.consume_wake_events(WAKE_DRAIN_LIMIT)?;

        // list_schedules is priority-ascending.
        for row in self.deps.store.list_schedules()? {
            if !row.enabled || tier < row.tier_minimum {
                continue;
            }
            let due = row
                .next_run_at
                .as_deref()
                .and_then(parse_iso)
                .map(|next| next <= started_at)
                .unwrap_or(true);
            if !due {
                continue;
            }
            let Some(task) = self.tasks.get(row.task_name.as_str()) else {
                tracing::warn!(task = %row.task_name, "scheduled task has no implementation");
                continue;
            };

            let result = self.run_task(&ctx, &row, task.clone(), &mut report).await;
            if let Err(e) = result {
                // Store trouble mid-task is the only thing that surfaces.
                self.deps.logger.error(
                    "heartbeat",
                    &format!("task bookkeeping failed for {}", row.task_name),
                    Some(LogError::from(&e)),
                );
            }
        }

        Ok(report)
    }

    async fn run_task(
        &self,
        ctx: &TickContext,
        row: &HeartbeatSchedule,
        task: Arc<dyn HeartbeatTask>,
        report: &mut TickReport,
    ) -> Result<()> {
        let store = &self.deps.store;
        let now = ctx.started_at;
        let now_iso = to_iso(now);

        // Lease: compare-and-swap on the schedule row.
        let lease_expiry = to_iso(now + Duration::milliseconds(row.timeout_ms as i64 + LEASE_SLACK_MS));
        if !store.try_acquire_lease(&row.task_name, &ctx.tick_id, &lease_expiry, &now_iso)? {
            tracing::debug!(task = %row.task_name, "lease held elsewhere, skipping");
            return Ok(());
        }

        // Idempotency: hourly bucket for slow tasks, per-due-slot for
        // fast ones.
        let period = approximate_period(row, now);
        let bucket = if period >= Duration::hours(1) {
            now_iso.chars().take(13).collect::<String>()
        } else {
            row.next_run_at.clone().unwrap_or_else(|| now_iso.clone())
        };
        let dedup_key = format!("{}:{}", row.task_name, bucket);
        let ttl = to_iso(now + period.max(Duration::milliseconds(row.timeout_ms as i64)));

        let next_run = to_iso(next_run_after(
            row,
            now,
            ctx.tier,
            self.deps.config.low_compute_multiplier,
        ));

        if store.dedup_exists(&dedup_key, &now_iso)? {
            let history = HeartbeatHistoryRow {
                id: new_id(),
                task_name: row.task_name.clone(),
                started_at: now_iso.clone(),
                completed_at: None,
                result: None,
                message: None,
                idempotency_key: format!("{dedup_key}:{}", ctx.tick_id),
            };
            store.insert_history_start(&history)?;
            store.complete_history(
                &history.id,
                &now_iso,
                TaskResult::Skipped,
                Some("dedup key active"),
            )?;
            store.update_schedule_after_run(
                &row.task_name,
                &now_iso,
                &next_run,
                TaskResult::Skipped,
                None,
            )?;
            store.release_lease(&row.task_name, &ctx.tick_id)?;
            report.outcomes.push((row.task_name.clone(), TaskResult::Skipped));
            return Ok(());
        }
        store.insert_dedup(&dedup_key, &row.task_name, &ttl)?;

        let history = HeartbeatHistoryRow {
            id: new_id(),
            task_name: row.task_name.clone(),
            started_at: now_iso.clone(),
            completed_at: None,
            result: None,
            message: None,
            idempotency_key: format!("{dedup_key}:{}", ctx.tick_id),
        };
        store.insert_history_start(&history)?;

        // Execute under the task's own timeout.
        let execution = tokio::time::timeout(
            std::time::Duration::from_millis(row.timeout_ms),
            task.run(ctx),
        )
        .await;

        let (result, message, error): (TaskResult, Option<String>, Option<String>) =
            match execution {
                Err(_) => (TaskResult::Timeout, None, Some("timed out".into())),
                Ok(Err(e)) => (TaskResult::Failure, None, Some(e.to_string())),
                Ok(Ok(outcome)) => {
                    if outcome.should_wake {
                        store.enqueue_wake(
                            "heartbeat",
                            outcome
                                .message
                                .as_deref()
                                .unwrap_or(row.task_name.as_str()),
                            &serde_json::json!({"task": row.task_name, "tick": ctx.tick_id}),
                        )?;
                        report.wakes_queued += 1;
                    }
                    (TaskResult::Success, outcome.message, None)
                }
            };

        let completed_iso = to_iso(Utc::now());
        store.update_schedule_after_run(
            &row.task_name,
            &now_iso,
            &next_run,
            result,
            error.as_deref(),
        )?;
        store.complete_history(
            &history.id,
            &completed_iso,
            result,
            message.as_deref().or(error.as_deref()),
        )?;
        store.release_lease(&row.task_name, &ctx.tick_id)?;

        self.deps.metrics.increment(
            "heartbeat_task",
            &[("task", &row.task_name), ("result", &result.to_string())],
        );
        if result == TaskResult::Failure {
            self.deps.logger.error(
                "heartbeat",
                &format!("task {} failed: {}", row.task_name, error.as_deref().unwrap_or("?")),
                None,
            );
        }
        report.outcomes.push((row.task_name.clone(), result));
        Ok(())
    }

    /// Tier with the dead-state grace period: a zero balance holds at
    /// `critical` until it has been zero for a full hour.
    fn effective_tier(&self, credit_cents: i64, now: DateTime<Utc>) -> Result<SurvivalTier> {
        let raw = SurvivalTier::from_cents(credit_cents);
        if raw != SurvivalTier::Dead {
            self.deps.store.delete_kv(CRITICAL_SINCE_KEY)?;
            return Ok(raw);
        }

        match self.deps.store.get_kv(CRITICAL_SINCE_KEY)?.as_deref().and_then(parse_iso) {
            None => {
                self.deps.store.set_kv(CRITICAL_SINCE_KEY, &to_iso(now))?;
                Ok(SurvivalTier::Critical)
            }
            Some(since) if now - since < Duration::seconds(DEAD_GRACE_SECS) => {
                Ok(SurvivalTier::Critical)
            }
            Some(_) => Ok(SurvivalTier::Dead),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{deps_with_balance, noop_task, wake_task};
    use automaton_core::SurvivalTier;

    fn schedule_row(name: &str, tier: SurvivalTier) -> HeartbeatSchedule {
        HeartbeatSchedule {
            task_name: name.into(),
            cron_expression: None,
            interval_ms: Some(60_000),
            priority: 10,
            timeout_ms: 5_000,
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

    #[tokio::test]
    async fn tick_runs_due_tasks_and_records_history() {
        let deps = deps_with_balance(1_000);
        let scheduler = Scheduler::new(deps.clone(), vec![noop_task("probe")]);
        scheduler
            .install_schedule(&[schedule_row("probe", SurvivalTier::Critical)])
            .unwrap();

        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.outcomes, vec![("probe".into(), TaskResult::Success)]);

        let row = deps.store.get_schedule("probe").unwrap().unwrap();
        assert_eq!(row.run_count, 1);
        assert_eq!(row.last_result.as_deref(), Some("success"));
        assert!(row.lease_owner.is_none());
        assert!(row.next_run_at.is_some());

        let history = deps.store.history_for_task("probe", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result, Some(TaskResult::Success));
    }

    #[tokio::test]
    async fn tier_gating_skips_expensive_tasks() {
        // 40 cents: low_compute tier.
        let deps = deps_with_balance(40);
        let scheduler = Scheduler::new(
            deps.clone(),
            vec![noop_task("cheap"), noop_task("expensive")],
        );
        scheduler
            .install_schedule(&[
                schedule_row("cheap", SurvivalTier::Critical),
                schedule_row("expensive", SurvivalTier::Normal),
            ])
            .unwrap();

        let report = scheduler.run_tick().await.unwrap();
        let names: Vec<&str> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"cheap"));
        assert!(!names.contains(&"expensive"));
    }

    #[tokio::test]
    async fn pending_wake_events_drain_fifo_and_bounded() {
        let deps = deps_with_balance(1_000);
        for i in 0..12 {
            deps.store
                .enqueue_wake("manual", &format!("reason-{i}"), &serde_json::Value::Null)
                .unwrap();
        }
        let scheduler = Scheduler::new(deps.clone(), vec![]);

        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.wake_events.len(), 10);
        assert_eq!(report.wake_events[0].reason, "reason-0");
        assert_eq!(report.wake_events[9].reason, "reason-9");
        // The overflow stays queued for the next tick.
        assert_eq!(deps.store.pending_wake_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn dead_ticks_leave_wake_events_queued() {
        let deps = deps_with_balance(0);
        deps.store
            .enqueue_wake("manual", "poke", &serde_json::Value::Null)
            .unwrap();
        let scheduler = Scheduler::new(deps.clone(), vec![]);

        // Backdate the grace marker so the tick reports dead.
        let old = to_iso(Utc::now() - Duration::hours(2));
        deps.store.set_kv("critical_since", &old).unwrap();

        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.tier, Some(SurvivalTier::Dead));
        assert!(report.wake_events.is_empty());
        assert_eq!(deps.store.pending_wake_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn should_wake_queues_an_event() {
        let deps = deps_with_balance(1_000);
        let scheduler = Scheduler::new(deps.clone(), vec![wake_task("noisy", "look alive")]);
        scheduler
            .install_schedule(&[schedule_row("noisy", SurvivalTier::Critical)])
            .unwrap();

        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.wakes_queued, 1);
        let events = deps.store.consume_wake_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "heartbeat");
        assert_eq!(events[0].reason, "look alive");
    }

    #[tokio::test]
    async fn not_yet_due_tasks_do_not_run() {
        let deps = deps_with_balance(1_000);
        let scheduler = Scheduler::new(deps.clone(), vec![noop_task("probe")]);
        scheduler
            .install_schedule(&[schedule_row("probe", SurvivalTier::Critical)])
            .unwrap();

        // First tick runs and advances next_run_at a minute out.
        scheduler.run_tick().await.unwrap();
        let second = scheduler.run_tick().await.unwrap();
        assert!(second.outcomes.is_empty());
    }

    #[tokio::test]
    async fn zero_balance_holds_critical_within_grace() {
        let deps = deps_with_balance(0);
        let scheduler = Scheduler::new(deps.clone(), vec![]);

        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.tier, Some(SurvivalTier::Critical));
        assert!(deps.store.get_kv("critical_since").unwrap().is_some());

        // Backdate the marker beyond the grace period.
        let old = to_iso(Utc::now() - Duration::hours(2));
        deps.store.set_kv("critical_since", &old).unwrap();
        let report = scheduler.run_tick().await.unwrap();
        assert_eq!(report.tier, Some(SurvivalTier::Dead));
    }

    #[tokio::test]
    async fn held_lease_blocks_execution() {
        let deps = deps_with_balance(1_000);
        let scheduler = Scheduler::new(deps.clone(), vec![noop_task("probe")]);
        scheduler
            .install_schedule(&[schedule_row("probe", SurvivalTier::Critical)])
            .unwrap();

        // Someone else holds a live lease.
        let future = to_iso(Utc::now() + Duration::minutes(10));
        deps.store
            .try_acquire_lease("probe", "other-owner", &future, &to_iso(Utc::now()))
            .unwrap();

        let report = scheduler.run_tick().await.unwrap();
        assert!(report.outcomes.is_empty());
    }
}
