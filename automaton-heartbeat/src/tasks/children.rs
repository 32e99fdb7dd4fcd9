//! check_child_health: probe the brood.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Runs the health monitor over every live child (fan-out capped at 3)
/// and wakes the agent when any of them is struggling.
pub struct CheckChildHealth;

#[async_trait]
impl HeartbeatTask for CheckChildHealth {
    fn name(&self) -> &'static str {
        "check_child_health"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let results = ctx.deps.health.check_all().await?;
        if results.is_empty() {
            return Ok(TaskOutcome::quiet());
        }

        let unhealthy: Vec<&str> = results
            .iter()
            .filter(|r| !r.healthy)
            .map(|r| r.child_id.as_str())
            .collect();

        ctx.deps
            .metrics
            .set_gauge("children_probed", results.len() as f64, &[]);
        ctx.deps
            .metrics
            .set_gauge("children_unhealthy", unhealthy.len() as f64, &[]);

        if unhealthy.is_empty() {
            Ok(TaskOutcome::quiet())
        } else {
            Ok(TaskOutcome::wake(format!(
                "{} unhealthy children: {}",
                unhealthy.len(),
                unhealthy.join(", ")
            )))
        }
    }
}
