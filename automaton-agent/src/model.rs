//! Model cascade: primary first, then the configured fallbacks.

use std::sync::Arc;

use automaton_core::{Error, ModelClient, ModelRequest, ModelResponse, Result, TokenUsage};

/// Call providers in order until one returns a usable response (text
/// or tool calls). All failures are folded into one aggregate error
/// naming each provider's complaint.
pub async fn call_with_fallback(
    providers: &[Arc<dyn ModelClient>],
    request: &ModelRequest,
) -> Result<ModelResponse> {
    if providers.is_empty() {
        return Err(Error::Unavailable("no model providers configured".into()));
    }

    let mut failures: Vec<String> = Vec::new();
    for provider in providers {
        match provider.chat(request.clone()).await {
            Ok(response) => {
                if response.content.is_empty() && response.tool_calls.is_empty() {
                    failures.push(format!("{}: empty response", provider.name()));
                    continue;
                }
                if !failures.is_empty() {
                    tracing::warn!(
                        provider = provider.name(),
                        skipped = failures.len(),
                        "fell back to secondary provider"
                    );
                }
                return Ok(response);
            }
            Err(e) => failures.push(format!("{}: {e}", provider.name())),
        }
    }

    Err(Error::Unavailable(format!(
        "all model providers failed: {}",
        failures.join("; ")
    )))
}

/// Rough per-model pricing in cents per million tokens, with the
/// platform's 1.3x markup folded in at the end.
pub fn estimate_cost_cents(usage: &TokenUsage, model: &str) -> i64 {
    let (input_price, output_price) = match model {
        "claude-sonnet-4-5" => (300.0, 1_500.0),
        "claude-haiku-4-5" => (100.0, 500.0),
        "gpt-4o" => (250.0, 1_000.0),
        "gpt-4o-mini" => (15.0, 60.0),
        _ => (250.0, 1_000.0),
    };
    let input_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * input_price;
    let output_cost = (usage.completion_tokens as f64 / 1_000_000.0) * output_price;
    ((input_cost + output_cost) * 1.3).ceil() as i64
}
