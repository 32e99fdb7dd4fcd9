//! Replication tools: spawn, fund, start, probe.

use async_trait::async_trait;

use automaton_core::validate::validate_address;
use automaton_core::{ChildState, Error, Result, RiskLevel, ToolCategory, new_id};
use automaton_lifecycle::{GenesisSpec, HealthMonitor};

use super::{Tool, ToolCtx, req_i64, req_str};

/// Create a child: validate genesis, enforce the population cap,
/// provision a sandbox, and walk it to `sandbox_created`.
pub struct SpawnChildTool;

#[async_trait]
impl Tool for SpawnChildTool {
    fn name(&self) -> &'static str {
        "spawn_child"
    }
    fn description(&self) -> &'static str {
        "Spawn a child agent with a genesis name, specialization, and first task."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Dangerous
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Replication
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "maxLength": 64},
                "specialization": {"type": "string"},
                "task": {"type": "string"},
                "message": {"type": "string"},
                "initial_credits_cents": {"type": "integer", "minimum": 0}
            },
            "required": ["name", "specialization", "task", "initial_credits_cents"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let config = ctx.config_snapshot();
        let living = ctx.store.count_living_children()?;
        if living >= config.max_children as i64 {
            return Err(Error::LimitExceeded(format!(
                "already {living} living children (cap {})",
                config.max_children
            )));
        }

        let spec = GenesisSpec {
            name: req_str(args, "name")?.to_string(),
            specialization: req_str(args, "specialization")?.to_string(),
            task: req_str(args, "task")?.to_string(),
            message: args["message"].as_str().map(Into::into),
            initial_credits_cents: req_i64(args, "initial_credits_cents")?,
        };

        let child_id = new_id();
        let child = ctx.lifecycle.init_child(&child_id, &spec)?;

        match ctx.sandbox.create_sandbox(&spec.name).await {
            Ok(info) => {
                ctx.store.set_child_sandbox(&child_id, &info.id)?;
                ctx.lifecycle.transition(
                    &child_id,
                    ChildState::SandboxCreated,
                    "sandbox provisioned",
                    serde_json::json!({"sandbox_id": info.id}),
                )?;
                Ok(format!("spawned child {child_id} ({}) in sandbox {}", child.name, info.id))
            }
            Err(e) => {
                ctx.lifecycle.transition(
                    &child_id,
                    ChildState::Failed,
                    "sandbox provisioning failed",
                    serde_json::json!({"error": e.to_string()}),
                )?;
                Err(e)
            }
        }
    }
}

/// Verify the child's wallet and seed it with credits.
pub struct FundChildTool;

#[async_trait]
impl Tool for FundChildTool {
    fn name(&self) -> &'static str {
        "fund_child"
    }
    fn description(&self) -> &'static str {
        "Verify a child's reported wallet address and transfer its seed credits."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Dangerous
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Replication
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "child_id": {"type": "string"},
                "address": {"type": "string"},
                "amount_cents": {"type": "integer", "minimum": 1}
            },
            "required": ["child_id", "address", "amount_cents"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let child_id = req_str(args, "child_id")?;
        let address = req_str(args, "address")?;
        validate_address(address)?;
        let amount_cents = req_i64(args, "amount_cents")?;

        // The child must have reached wallet_verified before money moves.
        let state = ctx.lifecycle.current_state(child_id)?;
        if state == ChildState::RuntimeReady {
            ctx.store.set_child_address(child_id, address)?;
            ctx.lifecycle.transition(
                child_id,
                ChildState::WalletVerified,
                "wallet reported and verified",
                serde_json::json!({"address": address}),
            )?;
        } else if state != ChildState::WalletVerified {
            return Err(Error::InvalidInput(format!(
                "child {child_id} is {state}, cannot fund"
            )));
        }

        let receipt = ctx
            .sandbox
            .transfer_credits(address, amount_cents, Some("genesis funding"))
            .await?;
        ctx.store.set_child_funded(child_id, amount_cents)?;
        ctx.lifecycle.transition(
            child_id,
            ChildState::Funded,
            "seed credits transferred",
            serde_json::json!({"amount_cents": amount_cents, "tx": receipt.tx_id}),
        )?;
        Ok(format!("funded child {child_id} with {amount_cents} cents"))
    }
}

/// Boot a funded child.
pub struct StartChildTool;

#[async_trait]
impl Tool for StartChildTool {
    fn name(&self) -> &'static str {
        "start_child"
    }
    fn description(&self) -> &'static str {
        "Start a funded child's runtime in its sandbox."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Caution
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Replication
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"child_id": {"type": "string"}},
            "required": ["child_id"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let child_id = req_str(args, "child_id")?;
        let child = ctx
            .store
            .get_child(child_id)?
            .ok_or_else(|| Error::not_found("child", child_id))?;

        if child.status != ChildState::Funded {
            return Err(Error::InvalidInput(format!(
                "child {child_id} is {}, cannot start",
                child.status
            )));
        }

        ctx.sandbox
            .exec_in(&child.sandbox_id, "automaton start --daemon", Some(30_000))
            .await?;
        ctx.lifecycle.transition(
            child_id,
            ChildState::Starting,
            "boot command issued",
            serde_json::Value::Null,
        )?;
        Ok(format!("started child {child_id}"))
    }
}

/// Probe the brood's health and report every child's state.
pub struct CheckChildHealthTool;

#[async_trait]
impl Tool for CheckChildHealthTool {
    fn name(&self) -> &'static str {
        "check_child_health"
    }
    fn description(&self) -> &'static str {
        "Probe your children's health and report each child's state."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Replication
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        if ctx.store.list_children()?.is_empty() {
            return Ok("no children".into());
        }

        // Probe live children (fan-out capped at 3) and apply any
        // resulting transitions before reporting.
        let monitor = HealthMonitor::new(ctx.lifecycle.clone(), ctx.sandbox.clone());
        let probes = monitor.check_all().await?;

        let lines: Vec<String> = ctx
            .store
            .list_children()?
            .iter()
            .map(|c| {
                let probe = match probes.iter().find(|p| p.child_id == c.id) {
                    Some(p) if p.healthy => "probe healthy".to_string(),
                    Some(p) => format!("probe failed: {}", p.detail),
                    None => "not probeable".to_string(),
                };
                format!(
                    "{} ({}): {}, funded {} cents, {probe}",
                    c.name, c.id, c.status, c.funded_amount_cents
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }
}
