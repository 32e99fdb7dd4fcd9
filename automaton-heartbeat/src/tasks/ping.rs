//! heartbeat_ping: prove liveness, flag distress.

use async_trait::async_trait;

use automaton_core::{Result, SurvivalTier};

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Writes the liveness marker every tick; at `critical` and below the
/// payload doubles as a distress signal under `last_distress`.
pub struct HeartbeatPing;

#[async_trait]
impl HeartbeatTask for HeartbeatPing {
    fn name(&self) -> &'static str {
        "heartbeat_ping"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let payload = serde_json::json!({
            "name": ctx.deps.config.name,
            "address": ctx.deps.identity.address,
            "tier": ctx.tier.to_string(),
            "credits_cents": ctx.credit_cents,
            "tick": ctx.tick_id,
            "at": automaton_core::id::to_iso(ctx.started_at),
        });
        ctx.deps.store.set_kv("last_ping", &payload.to_string())?;

        if ctx.tier <= SurvivalTier::Critical {
            ctx.deps
                .store
                .set_kv("last_distress", &payload.to_string())?;
            ctx.deps.logger.warn(
                "heartbeat",
                &format!("distress: tier {} at {} cents", ctx.tier, ctx.credit_cents),
            );
        }

        Ok(TaskOutcome::quiet())
    }
}
