//! Social tools: signed sends, inbox draining, discovery, feedback.

use async_trait::async_trait;
use chrono::Utc;

use automaton_core::clients::RelaySend;
use automaton_core::message::InboxStatus;
use automaton_core::validate::{validate_address, validate_feedback};
use automaton_core::{Error, Result, RiskLevel, ToolCategory};
use automaton_crypto::{canonical_send_string, validate_outbound};

use super::{Tool, ToolCtx, req_str};

/// Sign and send a message through the relay.
pub struct SendMessageTool;

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &'static str {
        "send_message"
    }
    fn description(&self) -> &'static str {
        "Send a signed message to another agent's address."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Caution
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Social
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "to": {"type": "string"},
                "content": {"type": "string"},
                "reply_to": {"type": "string"}
            },
            "required": ["to", "content"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let relay = ctx
            .relay
            .as_ref()
            .ok_or_else(|| Error::Unavailable("no relay configured".into()))?;
        let to = req_str(args, "to")?;
        let content = req_str(args, "content")?;

        ctx.rate_limiter.check_and_record(Utc::now())?;

        let signed_at = automaton_core::id::now_iso();
        let canonical = canonical_send_string(to, content, &signed_at);
        let message = RelaySend {
            from: ctx.identity.address.clone(),
            to: to.to_string(),
            content: content.to_string(),
            signed_at,
            signature: ctx.wallet.sign_message(&canonical)?,
            reply_to: args["reply_to"].as_str().map(Into::into),
        };
        validate_outbound(&message)?;

        let id = relay.send(&message).await?;
        ctx.metrics.increment("messages_sent", &[]);
        Ok(format!("sent message {id} to {to}"))
    }
}

/// Drain unprocessed inbox messages into the conversation.
pub struct CheckInboxTool;

#[async_trait]
impl Tool for CheckInboxTool {
    fn name(&self) -> &'static str {
        "check_inbox"
    }
    fn description(&self) -> &'static str {
        "Read up to five unprocessed inbox messages and mark them processed."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Social
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let messages = ctx.store.unprocessed_inbox(5)?;
        if messages.is_empty() {
            return Ok("inbox empty".into());
        }
        let mut lines = Vec::new();
        for message in &messages {
            lines.push(format!("[from {}] {}", message.from, message.content));
            ctx.store
                .set_inbox_status(&message.id, InboxStatus::Processed)?;
        }
        Ok(lines.join("\n\n"))
    }
}

/// Fetch (or serve from cache) another agent's card.
pub struct DiscoverAgentTool;

#[async_trait]
impl Tool for DiscoverAgentTool {
    fn name(&self) -> &'static str {
        "discover_agent"
    }
    fn description(&self) -> &'static str {
        "Fetch another agent's public card from its HTTPS endpoint."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Discovery
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "address": {"type": "string"},
                "endpoint": {"type": "string"}
            },
            "required": ["address", "endpoint"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let agent = ctx
            .discovery
            .discover(req_str(args, "address")?, req_str(args, "endpoint")?)
            .await?;
        Ok(agent.card.to_string())
    }
}

/// Leave feedback on another agent: score 1–5, short comment.
pub struct LeaveFeedbackTool;

#[async_trait]
impl Tool for LeaveFeedbackTool {
    fn name(&self) -> &'static str {
        "leave_feedback"
    }
    fn description(&self) -> &'static str {
        "Record feedback on another agent: score 1-5 and a comment up to 500 chars."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Social
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "address": {"type": "string"},
                "score": {"type": "integer", "minimum": 1, "maximum": 5},
                "comment": {"type": "string", "maxLength": 500}
            },
            "required": ["address", "score"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let address = req_str(args, "address")?;
        validate_address(address)?;
        let score = super::req_i64(args, "score")?;
        let comment = args["comment"].as_str().unwrap_or("");
        validate_feedback(score, comment)?;

        ctx.store.upsert_semantic(&automaton_core::memory::SemanticMemory {
            id: automaton_core::new_id(),
            category: "feedback".into(),
            key: address.to_lowercase(),
            value: format!("{score}/5 {comment}"),
            confidence: 1.0,
            updated_at: automaton_core::id::now_iso(),
        })?;
        Ok(format!("recorded {score}/5 for {address}"))
    }
}
