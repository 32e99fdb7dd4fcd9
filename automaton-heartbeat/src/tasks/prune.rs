//! prune_dead_children: keep the graveyard small.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

const KEEP_LAST: usize = 5;

/// Cleans up and deletes dead children beyond the five most recent.
pub struct PruneDeadChildren;

#[async_trait]
impl HeartbeatTask for PruneDeadChildren {
    fn name(&self) -> &'static str {
        "prune_dead_children"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let report = ctx
            .deps
            .lifecycle
            .prune_dead_children(&ctx.deps.sandbox, KEEP_LAST)
            .await?;

        if !report.pruned.is_empty() {
            ctx.deps.logger.info(
                "lifecycle",
                &format!("pruned {} dead children", report.pruned.len()),
            );
            ctx.deps
                .metrics
                .add("children_pruned", report.pruned.len() as f64, &[]);
        }
        Ok(TaskOutcome::quiet())
    }
}
