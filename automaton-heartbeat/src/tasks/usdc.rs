//! check_usdc_balance: record the on-chain balance.

use async_trait::async_trait;

use automaton_core::Result;

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

/// Persists the tick's USDC balance (fetched once by the scheduler)
/// and refreshes pending transaction receipts.
pub struct CheckUsdcBalance;

#[async_trait]
impl HeartbeatTask for CheckUsdcBalance {
    fn name(&self) -> &'static str {
        "check_usdc_balance"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        ctx.deps
            .store
            .set_kv("usdc_balance", &ctx.usdc_balance.to_string())?;

        for tx_hash in ctx.deps.store.pending_onchain_hashes()? {
            match ctx.deps.chain.receipt(&tx_hash).await {
                Ok(Some((success, gas_used))) => {
                    let status = if success {
                        automaton_core::message::TxStatus::Confirmed
                    } else {
                        automaton_core::message::TxStatus::Failed
                    };
                    ctx.deps
                        .store
                        .update_onchain_status(&tx_hash, status, Some(gas_used))?;
                }
                Ok(None) => {} // still pending
                Err(e) => {
                    tracing::warn!(tx = %tx_hash, error = %e, "receipt fetch failed");
                }
            }
        }

        Ok(TaskOutcome::quiet())
    }
}
