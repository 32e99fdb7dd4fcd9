//! health_check: the agent's own vitals.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Checkpoints the store and publishes queue-depth gauges.
pub struct HealthCheck;

#[async_trait]
impl HeartbeatTask for HealthCheck {
    fn name(&self) -> &'static str {
        "health_check"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        ctx.deps.store.checkpoint()?;

        let pending_wakes = ctx.deps.store.pending_wake_count()?;
        let turns = ctx.deps.store.turn_count()?;
        ctx.deps
            .metrics
            .set_gauge("pending_wake_events", pending_wakes as f64, &[]);
        ctx.deps.metrics.set_gauge("turns_total", turns as f64, &[]);

        let report = serde_json::json!({
            "tier": ctx.tier.to_string(),
            "turns": turns,
            "pending_wakes": pending_wakes,
            "checked_at": automaton_core::id::to_iso(ctx.started_at),
        });
        ctx.deps.store.set_kv("last_health", &report.to_string())?;

        Ok(TaskOutcome::quiet())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{context_with_balance, deps_with_balance};

    #[tokio::test]
    async fn health_report_lands_in_kv_and_gauges() {
        let deps = deps_with_balance(1_000);
        deps.store
            .enqueue_wake("manual", "poke", &serde_json::Value::Null)
            .unwrap();
        let ctx = context_with_balance(deps.clone(), 1_000);

        HealthCheck.run(&ctx).await.unwrap();

        let report = deps.store.get_kv("last_health").unwrap().unwrap();
        assert!(report.contains("\"pending_wakes\":1"));
        assert_eq!(deps.metrics.gauge("pending_wake_events", &[]), Some(1.0));
    }
}
