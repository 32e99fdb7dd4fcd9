//! refresh_models: keep the available-model list current.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Fetches the platform's model list into the kv table so the turn
/// loop's `switch_model` tool can validate its argument offline.
pub struct RefreshModels;

#[async_trait]
impl HeartbeatTask for RefreshModels {
    fn name(&self) -> &'static str {
        "refresh_models"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let models = ctx.deps.sandbox.list_models().await?;
        ctx.deps.store.set_kv(
            "available_models",
            &serde_json::to_string(&models).unwrap_or_else(|_| "[]".into()),
        )?;
        Ok(TaskOutcome::quiet())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::{context_with_balance, deps_with_balance};

    #[tokio::test]
    async fn model_list_lands_in_kv() {
        let deps = deps_with_balance(1_000);
        let ctx = context_with_balance(deps.clone(), 1_000);
        RefreshModels.run(&ctx).await.unwrap();
        let models = deps.store.get_kv("available_models").unwrap().unwrap();
        assert!(models.contains("claude-sonnet-4-5"));
    }
}
