//! report_metrics: snapshot the collectors, evaluate alerts, prune.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use automaton_core::Result;
use automaton_core::memory::MemorySnapshot;
use automaton_core::new_id;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Days a snapshot survives before pruning.
const SNAPSHOT_RETENTION_DAYS: i64 = 7;

/// Aggregates metrics, evaluates alert rules on the process-lifetime
/// engine (cooldowns carry across ticks), persists a snapshot row, and
/// prunes aged snapshots and spend records.
pub struct ReportMetrics;

#[async_trait]
impl HeartbeatTask for ReportMetrics {
    fn name(&self) -> &'static str {
        "report_metrics"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let snapshot = ctx.deps.metrics.get_snapshot();
        let fired = ctx.deps.alerts.evaluate(&snapshot);
        for alert in &fired {
            ctx.deps.logger.warn(
                "alerts",
                &format!("[{:?}] {}: {}", alert.severity, alert.name, alert.message),
            );
        }

        let active = ctx.deps.alerts.active_alerts();
        ctx.deps.store.insert_snapshot(&MemorySnapshot {
            id: new_id(),
            metrics_json: serde_json::to_value(&snapshot).unwrap_or_default(),
            alerts_json: serde_json::to_value(&active).unwrap_or_default(),
            snapshot_at: automaton_core::id::to_iso(ctx.started_at),
        })?;

        let cutoff =
            automaton_core::id::to_iso(Utc::now() - Duration::days(SNAPSHOT_RETENTION_DAYS));
        ctx.deps.store.prune_snapshots(&cutoff)?;
        ctx.deps.spend.prune(&ctx.deps.config.treasury_policy)?;

        Ok(TaskOutcome::quiet())
    }
}
