//! check_credits: watch the balance, wake on tier drops.

use async_trait::async_trait;

use automaton_core::{Result, SurvivalTier};

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Compares the tick's tier against the last one seen and wakes the
/// agent when survival worsened. The balance itself was fetched once by
/// the scheduler; this task only interprets it.
pub struct CheckCredits;

#[async_trait]
impl HeartbeatTask for CheckCredits {
    fn name(&self) -> &'static str {
        "check_credits"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let previous = ctx
            .deps
            .store
            .get_kv("last_tier_seen")?
            .as_deref()
            .and_then(SurvivalTier::parse);
        ctx.deps
            .store
            .set_kv("last_tier_seen", &ctx.tier.to_string())?;

        if let Some(previous) = previous {
            if ctx.tier < previous {
                return Ok(TaskOutcome::wake(format!(
                    "survival tier dropped {previous} → {} at {} cents",
                    ctx.tier, ctx.credit_cents
                )));
            }
        }
        Ok(TaskOutcome::quiet())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{context_with_balance, deps_with_balance};

    #[tokio::test]
    async fn tier_drop_wakes_the_agent() {
        let deps = deps_with_balance(1_000);

        let rich = context_with_balance(deps.clone(), 1_000);
        assert!(!CheckCredits.run(&rich).await.unwrap().should_wake);

        let poor = context_with_balance(deps.clone(), 30);
        let outcome = CheckCredits.run(&poor).await.unwrap();
        assert!(outcome.should_wake);
        assert!(outcome.message.unwrap().contains("high → low_compute"));
    }

    #[tokio::test]
    async fn steady_tier_stays_quiet() {
        let deps = deps_with_balance(1_000);
        let ctx = context_with_balance(deps.clone(), 1_000);
        CheckCredits.run(&ctx).await.unwrap();
        assert!(!CheckCredits.run(&ctx).await.unwrap().should_wake);
    }
}
