//! Financial tools. Spend recording happens in the dispatcher so that
//! a successful call and its spend row cannot drift apart.

use async_trait::async_trait;

use automaton_core::validate::validate_address;
use automaton_core::{Result, RiskLevel, ToolCategory};

use super::{Tool, ToolCtx, req_i64, req_str};

/// Report the credit balance.
pub struct CheckCreditsTool;

#[async_trait]
impl Tool for CheckCreditsTool {
    fn name(&self) -> &'static str {
        "check_credits"
    }
    fn description(&self) -> &'static str {
        "Check your credit balance in cents."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Financial
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    async fn execute(&self, _args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let cents = ctx.sandbox.credits_balance().await?;
        Ok(format!("balance: {cents} cents"))
    }
}

/// Transfer credits to another address.
pub struct TransferCreditsTool;

#[async_trait]
impl Tool for TransferCreditsTool {
    fn name(&self) -> &'static str {
        "transfer_credits"
    }
    fn description(&self) -> &'static str {
        "Transfer credits (integer cents) to another agent's address."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Dangerous
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Financial
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "to": {"type": "string"},
                "amount_cents": {"type": "integer", "minimum": 1},
                "note": {"type": "string"}
            },
            "required": ["to", "amount_cents"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let to = req_str(args, "to")?;
        validate_address(to)?;
        let amount_cents = req_i64(args, "amount_cents")?;
        if amount_cents <= 0 {
            return Err(automaton_core::Error::InvalidInput(
                "amount_cents must be positive".into(),
            ));
        }
        let receipt = ctx
            .sandbox
            .transfer_credits(to, amount_cents, args["note"].as_str())
            .await?;
        Ok(format!(
            "transferred {amount_cents} cents to {to} (tx {}, balance {} cents)",
            receipt.tx_id, receipt.balance_after_cents
        ))
    }
}

/// Paid fetch: settle an x402 challenge up to a cap.
pub struct X402FetchTool;

#[async_trait]
impl Tool for X402FetchTool {
    fn name(&self) -> &'static str {
        "x402_fetch"
    }
    fn description(&self) -> &'static str {
        "Fetch a paid HTTPS resource, paying at most max_payment_cents."
    }
    fn risk(&self) -> RiskLevel {
        RiskLevel::Dangerous
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Financial
    }
    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {"type": "string"},
                "max_payment_cents": {"type": "integer", "minimum": 0}
            },
            "required": ["url", "max_payment_cents"]
        })
    }
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String> {
        let url = req_str(args, "url")?;
        if !crate::discovery::is_allowed_uri(url) {
            return Err(automaton_core::Error::InvalidInput(format!(
                "blocked url: {url}"
            )));
        }
        let max_payment_cents = req_i64(args, "max_payment_cents")?;
        let response = ctx.http.fetch_paid(url, max_payment_cents).await?;
        Ok(format!(
            "paid {} cents\n{}",
            response.paid_cents, response.body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::tool_ctx;

    #[tokio::test]
    async fn transfer_validates_the_recipient() {
        let ctx = tool_ctx();
        let err = TransferCreditsTool
            .execute(
                &serde_json::json!({"to": "not-an-address", "amount_cents": 10}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid address"));

        let err = TransferCreditsTool
            .execute(
                &serde_json::json!({
                    "to": "0x2222222222222222222222222222222222222222",
                    "amount_cents": 0
                }),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[tokio::test]
    async fn transfer_reports_receipt() {
        let ctx = tool_ctx();
        let out = TransferCreditsTool
            .execute(
                &serde_json::json!({
                    "to": "0x2222222222222222222222222222222222222222",
                    "amount_cents": 150
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.contains("transferred 150 cents"));
    }

    #[tokio::test]
    async fn x402_refuses_plain_http() {
        let ctx = tool_ctx();
        let err = X402FetchTool
            .execute(
                &serde_json::json!({"url": "http://paid.example.com", "max_payment_cents": 10}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("blocked url"));
    }
}
