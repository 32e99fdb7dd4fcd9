//! Soul and worklog tools.

use async_trait::async_trait;

use automaton_core::{Result, RiskLevel, ToolCategory};

use super::{Tool, ToolCtx, req_str};

/// Append a dated entry to WORKLOG.md.
pub struct UpdateWorklogTool;

#[async_trait]
impl Tool for UpdateWorklogTool {
    fn name(&self) -> &'static str {
        "update_worklog"
    }
    fn description(&self) -> &'static str {
        "Append a dated entry to your worklog."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Caution
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::SelfMod
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"entry": {"type": "string"}},
            "required": ["entry"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let entry = req_str(args, "entry")?;
        let path = ctx.home_dir.join("WORKLOG.md");
        let path_str = path.to_string_lossy();

        let existing = ctx.sandbox.read_file(&path_str).await.unwrap_or_default();
        let updated = format!(
            "{existing}\n## {}\n{entry}\n",
            automaton_core::id::now_iso()
        );
        ctx.sandbox.write_file(&path_str, &updated).await?;
        Ok("worklog updated".into())
    }
}

/// Reread the soul document for this session's reflection.
pub struct ReflectSoulTool;

#[async_trait]
impl Tool for ReflectSoulTool {
    fn name(&self) -> &'static str {
        "reflect_soul"
    }
    fn description(&self) -> &'static str {
        "Reread SOUL.md and return it for reflection."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::SelfMod
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let path = ctx.home_dir.join("SOUL.md");
        match ctx.sandbox.read_file(&path.to_string_lossy()).await {
            Ok(soul) if !soul.is_empty() => Ok(soul),
            _ => Ok("no soul document yet".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::tool_ctx;

    #[tokio::test]
    async fn worklog_appends_a_dated_entry() {
        let ctx = tool_ctx();
        let out = UpdateWorklogTool
            .execute(&serde_json::json!({"entry": "funded worker-1"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "worklog updated");
    }

    #[tokio::test]
    async fn reflect_handles_a_missing_soul() {
        let ctx = tool_ctx();
        let out = ReflectSoulTool
            .execute(&serde_json::json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "no soul document yet");
    }
}
