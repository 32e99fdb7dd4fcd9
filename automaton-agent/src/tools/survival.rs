//! Survival tools: sleep and model switching.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use automaton_core::{AgentState, Error, Result, RiskLevel, ToolCategory};

use super::{Tool, ToolCtx, req_i64, req_str};

/// Go to sleep until a wake event or the timer.
pub struct SleepTool;

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &'static str {
        "sleep"
    }
    fn description(&self) -> &'static str {
        "Sleep for the given seconds. Heartbeats keep running; wake events end the nap early."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Survival
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"seconds": {"type": "integer", "minimum": 1, "maximum": 86400}},
            "required": ["seconds"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let seconds = req_i64(args, "seconds")?.clamp(1, 86_400);
        let until = automaton_core::id::to_iso(Utc::now() + Duration::seconds(seconds));
        ctx.store.set_kv("sleep_until", &until)?;
        ctx.store
            .set_kv("agent_state", &AgentState::Sleeping.to_string())?;
        Ok(format!("sleeping until {until}"))
    }
}

/// Switch the inference model, persisting the config atomically.
pub struct SwitchModelTool;

#[async_trait]
impl Tool for SwitchModelTool {
    fn name(&self) -> &'static str {
        "switch_model"
    }
    fn description(&self) -> &'static str {
        "Switch the model used at normal tier. The model must be in the available list."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Caution
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Survival
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"model": {"type": "string"}},
            "required": ["model"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let model = req_str(args, "model")?;

        // Validate against the platform list cached by refresh_models.
        if let Some(raw) = ctx.store.get_kv("available_models")? {
            let available: Vec<String> =
                automaton_state::safe_parse(&raw, vec![], "kv.available_models");
            if !available.is_empty() && !available.iter().any(|m| m == model) {
                return Err(Error::InvalidInput(format!(
                    "model {model} is not in the available list"
                )));
            }
        }

        // In-memory and persisted config move together.
        let updated = {
            let mut config = ctx.config.write().expect("config lock poisoned");
            config.inference_model = model.to_string();
            config.clone()
        };
        let json = serde_json::to_string_pretty(&updated)
            .map_err(|e| Error::Integrity(format!("config serialize failed: {e}")))?;
        let tmp = ctx.config_path.with_extension("tmp");
        std::fs::write(&tmp, &json)
            .and_then(|()| std::fs::rename(&tmp, &ctx.config_path))
            .map_err(|e| Error::Integrity(format!("config persist failed: {e}")))?;

        Ok(format!("switched inference model to {model}"))
    }
}
