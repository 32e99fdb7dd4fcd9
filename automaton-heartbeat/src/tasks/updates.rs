//! check_for_updates: ask the sandbox whether upstream moved.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

const FETCH_COMMAND: &str = "git -C /opt/automaton fetch origin main --dry-run 2>&1";

/// Dry-run fetches the runtime checkout. Any output means upstream has
/// commits we do not; the agent is woken to decide what to do about it.
pub struct CheckForUpdates;

#[async_trait]
impl HeartbeatTask for CheckForUpdates {
    fn name(&self) -> &'static str {
        "check_for_updates"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let result = ctx.deps.sandbox.exec(FETCH_COMMAND, Some(30_000)).await?;
        let output = format!("{}{}", result.stdout, result.stderr);
        let has_updates = result.exit_code == 0 && !output.trim().is_empty();

        ctx.deps
            .store
            .set_kv("update_available", if has_updates { "true" } else { "false" })?;

        if has_updates {
            Ok(TaskOutcome::wake("upstream has new commits"))
        } else {
            Ok(TaskOutcome::quiet())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{context_with_balance, deps_with_balance, with_exec_output};

    #[tokio::test]
    async fn quiet_when_up_to_date() {
        let deps = with_exec_output(deps_with_balance(1_000), "");
        let ctx = context_with_balance(deps.clone(), 1_000);
        let outcome = CheckForUpdates.run(&ctx).await.unwrap();
        assert!(!outcome.should_wake);
        assert_eq!(
            deps.store.get_kv("update_available").unwrap().unwrap(),
            "false"
        );
    }

    #[tokio::test]
    async fn wakes_when_upstream_moved() {
        let deps = with_exec_output(
            deps_with_balance(1_000),
            "   abc123..def456  main -> origin/main",
        );
        let ctx = context_with_balance(deps.clone(), 1_000);
        let outcome = CheckForUpdates.run(&ctx).await.unwrap();
        assert!(outcome.should_wake);
    }
}
