//! soul_reflection: queue a reflection turn when enabled.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Periodically asks the agent to reflect on its soul document. The
/// reflection itself happens in a turn; this task only wakes the loop.
pub struct SoulReflection;

#[async_trait]
impl HeartbeatTask for SoulReflection {
    fn name(&self) -> &'static str {
        "soul_reflection"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        if !ctx.deps.config.soul_config.reflection_enabled {
            return Ok(TaskOutcome::quiet());
        }
        Ok(TaskOutcome::wake(
            "reflection time: reread SOUL.md and update the worklog",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{context_with_balance, deps_with_balance, with_config};

    #[tokio::test]
    async fn wakes_when_enabled_quiet_when_not() {
        let deps = deps_with_balance(1_000);
        let ctx = context_with_balance(deps.clone(), 1_000);
        assert!(SoulReflection.run(&ctx).await.unwrap().should_wake);

        let deps = with_config(deps, |c| c.soul_config.reflection_enabled = false);
        let ctx = context_with_balance(deps, 1_000);
        assert!(!SoulReflection.run(&ctx).await.unwrap().should_wake);
    }
}
