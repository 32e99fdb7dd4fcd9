//! One reasoning turn, end to end.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};

use automaton_core::id::{parse_iso, to_iso};
use automaton_core::{
    AgentState, AgentTurn, Error, InputSource, ModelClient, ModelRequest, ModelToolCall, Result,
    SurvivalTier, ToolCallResult, ToolCategory, new_id,
};
use automaton_crypto::keccak_hex;
use automaton_memory::MemoryIngestor;
use automaton_observe::LogError;
use automaton_policy::{
    PolicyEngine, PolicyRequest, TurnPolicyContext, financial_amount_cents, financial_category,
};

use crate::context::build_messages;
use crate::model::{call_with_fallback, estimate_cost_cents};
use crate::prompt::{CONSTITUTION_FALLBACK, PromptInputs, SkillSection, build_system_prompt};
use crate::reasoning::parse_reasoning;
use crate::sanitize::{EXTERNAL_SOURCE_TOOLS, sanitize_external};
use crate::tools::{ToolCtx, ToolRegistry};

/// Input for one turn, when the caller already has it in hand.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// The content fed to the model.
    pub content: String,
    /// Where it came from.
    pub source: InputSource,
}

impl TurnInput {
    /// Turn a consumed wake event into turn input. The scheduler drains
    /// events into its tick report; the loop driver feeds them here.
    pub fn from_wake(event: &automaton_core::WakeEvent) -> Self {
        Self {
            content: format!("[{}] {}", event.source, event.reason),
            source: match event.source.as_str() {
                "heartbeat" => InputSource::Heartbeat,
                "creator" => InputSource::Creator,
                "inbox" | "agent" => InputSource::Agent,
                _ => InputSource::System,
            },
        }
    }
}

/// Drives turns: prompt assembly, the model cascade, policy-gated tool
/// dispatch, persistence, and memory ingestion.
pub struct TurnRunner {
    ctx: ToolCtx,
    registry: ToolRegistry,
    policy: Arc<PolicyEngine>,
    providers: Vec<Arc<dyn ModelClient>>,
    ingestor: MemoryIngestor,
    skills: Vec<SkillSection>,
    session_id: String,
}

impl TurnRunner {
    /// Runner over the shared context. One session per process run.
    pub fn new(
        ctx: ToolCtx,
        registry: ToolRegistry,
        policy: Arc<PolicyEngine>,
        providers: Vec<Arc<dyn ModelClient>>,
        skills: Vec<SkillSection>,
    ) -> Self {
        let ingestor = MemoryIngestor::new(ctx.store.clone());
        Self {
            ctx,
            registry,
            policy,
            providers,
            ingestor,
            skills,
            session_id: new_id(),
        }
    }

    /// The session id working memory is scoped to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run one turn. `input` may be given by the caller (the waking
    /// transition); otherwise the next wake event is consumed.
    pub async fn run_turn(&self, input: Option<TurnInput>) -> Result<AgentTurn> {
        let input = match input {
            Some(input) => Some(input),
            None => self.next_wake_input()?,
        };

        self.ctx
            .store
            .set_kv("agent_state", &AgentState::Running.to_string())?;

        // Financial context for this turn.
        let credit_cents = self.ctx.sandbox.credits_balance().await.unwrap_or_else(|e| {
            self.ctx
                .logger
                .error("turn_loop", "balance fetch failed", Some(LogError::from(&e)));
            0
        });
        let usdc_balance = self
            .ctx
            .chain
            .usdc_balance(&self.ctx.identity.address)
            .await
            .unwrap_or(0.0);
        let tier = SurvivalTier::from_cents(credit_cents);
        let config = self.ctx.config_snapshot();

        // Layered prompt.
        let constitution = self.load_constitution().await;
        let soul = self.read_home_file("SOUL.md").await;
        let worklog = self.read_home_file("WORKLOG.md").await;
        let recent = self.ctx.store.recent_turns(20)?;
        let turn_count = self.ctx.store.turn_count()?;
        let lineage_summary = self.lineage_summary()?;
        let memory_digest = self.memory_digest()?;
        let tools = self.registry.specs();

        let system = build_system_prompt(&PromptInputs {
            config: &config,
            identity: &self.ctx.identity,
            constitution: &constitution,
            soul: soul.as_deref(),
            worklog: worklog.as_deref(),
            skills: &self.skills,
            state: tier.agent_state(),
            tier,
            credit_cents,
            usdc_balance,
            turn_count,
            lineage_summary: &lineage_summary,
            memory_digest: &memory_digest,
            tools: &tools,
        });

        let source_label = input
            .as_ref()
            .map(|i| i.source.to_string())
            .unwrap_or_else(|| "system".into());
        let messages = build_messages(
            &recent,
            input.as_ref().map(|i| (i.content.as_str(), source_label.as_str())),
        );

        let request = ModelRequest {
            model: config.model_for(tier).to_string(),
            system,
            messages,
            tools,
            max_tokens: config
                .model_strategy
                .max_tokens_for(tier)
                .min(config.max_tokens_per_turn),
        };

        let response = match call_with_fallback(&self.providers, &request).await {
            Ok(response) => response,
            Err(e) => {
                self.ctx.metrics.increment("turn_failures", &[]);
                if tier <= SurvivalTier::LowCompute {
                    self.ctx
                        .store
                        .set_kv("agent_state", &AgentState::LowCompute.to_string())?;
                }
                return Err(e);
            }
        };

        let turn_id = new_id();
        let thinking = response
            .thinking
            .clone()
            .unwrap_or_else(|| response.content.clone());

        // Dispatch every requested tool through policy.
        let mut policy_ctx = TurnPolicyContext {
            input_source: input.as_ref().map(|i| i.source),
            ..Default::default()
        };
        let mut tool_calls = Vec::new();
        for call in &response.tool_calls {
            let result = self.dispatch(&turn_id, call, &mut policy_ctx).await;
            tool_calls.push(result);
        }

        let cost_cents = estimate_cost_cents(&response.usage, &request.model);
        let turn = AgentTurn {
            id: turn_id.clone(),
            timestamp: automaton_core::id::now_iso(),
            state: tier.agent_state(),
            input: input.as_ref().map(|i| i.content.clone()),
            input_source: input.as_ref().map(|i| i.source),
            thinking,
            tool_calls,
            token_usage: response.usage.clone(),
            cost_cents,
        };

        // Persist the whole turn in one transaction.
        let steps = parse_reasoning(&turn_id, &turn.thinking);
        self.ctx.store.insert_turn(&turn, &steps)?;

        if cost_cents > 0 {
            if let Err(e) = self.ctx.spend.record_spend(
                "inference",
                cost_cents,
                &request.model,
                automaton_core::SpendCategory::Inference,
            ) {
                self.ctx.logger.error(
                    "turn_loop",
                    "inference spend recording failed",
                    Some(LogError::from(&e)),
                );
            }
        }

        self.ctx.metrics.increment("turns", &[]);
        self.ctx
            .metrics
            .record("turn_tokens", turn.token_usage.total_tokens as f64, &[]);

        // Memory ingestion is best-effort and never fails the turn.
        self.ingestor.ingest(&turn, &self.session_id);

        Ok(turn)
    }

    /// Drive turns until the agent chooses (or earns) sleep: a
    /// successful `sleep` call ends the session, a turn with no input
    /// and no tool calls naps for a minute, and five consecutive turn
    /// failures back the agent off for five minutes.
    pub async fn run_session(&self, first_input: Option<TurnInput>) -> Result<AgentState> {
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;
        const IDLE_SLEEP_SECS: i64 = 60;
        const ERROR_SLEEP_SECS: i64 = 300;

        let mut consecutive_errors = 0u32;
        let mut pending = first_input;

        loop {
            // Respect an active sleep window.
            if let Some(until) = self.ctx.store.get_kv("sleep_until")? {
                if parse_iso(&until).is_some_and(|t| t > Utc::now()) {
                    self.ctx
                        .store
                        .set_kv("agent_state", &AgentState::Sleeping.to_string())?;
                    return Ok(AgentState::Sleeping);
                }
            }

            match self.run_turn(pending.take()).await {
                Ok(turn) => {
                    consecutive_errors = 0;

                    let slept = turn
                        .tool_calls
                        .iter()
                        .any(|c| c.name == "sleep" && c.error.is_none());
                    if slept {
                        return Ok(AgentState::Sleeping);
                    }

                    if turn.tool_calls.is_empty() && turn.input.is_none() {
                        // Natural pause: nothing queued, nothing asked.
                        self.sleep_for(IDLE_SLEEP_SECS)?;
                        return Ok(AgentState::Sleeping);
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    self.ctx.logger.error(
                        "turn_loop",
                        &format!("turn failed ({consecutive_errors} in a row)"),
                        Some(LogError::from(&e)),
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        self.sleep_for(ERROR_SLEEP_SECS)?;
                        return Ok(AgentState::Sleeping);
                    }
                }
            }
        }
    }

    fn sleep_for(&self, seconds: i64) -> Result<()> {
        let until = to_iso(Utc::now() + Duration::seconds(seconds));
        self.ctx.store.set_kv("sleep_until", &until)?;
        self.ctx
            .store
            .set_kv("agent_state", &AgentState::Sleeping.to_string())?;
        Ok(())
    }

    async fn dispatch(
        &self,
        turn_id: &str,
        call: &ModelToolCall,
        policy_ctx: &mut TurnPolicyContext,
    ) -> ToolCallResult {
        let started = Instant::now();

        let Some(tool) = self.registry.get(&call.name) else {
            let mut result = ToolCallResult::failed(&call.id, &call.name, "Unknown tool");
            result.args = call.args.clone();
            return result;
        };
        let tool = tool.clone();

        let verdict = {
            let request = PolicyRequest {
                tool_name: &call.name,
                risk: tool.risk(),
                category: tool.category(),
                args: &call.args,
                turn: policy_ctx,
            };
            self.policy.evaluate(turn_id, tool.risk(), &request)
        };
        policy_ctx.turn_tool_call_count += 1;

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(e) => {
                // A broken policy check fails closed.
                self.ctx.logger.error(
                    "turn_loop",
                    "policy evaluation failed",
                    Some(LogError::from(&e)),
                );
                let mut result =
                    ToolCallResult::failed(&call.id, &call.name, "Policy denied: engine_error");
                result.args = call.args.clone();
                return result;
            }
        };

        if !verdict.is_allowed() {
            let code = verdict.reason_code.as_deref().unwrap_or("denied");
            let message = verdict
                .message
                .clone()
                .unwrap_or_else(|| format!("Policy denied: {code}"));
            self.ctx
                .metrics
                .increment("policy_denials", &[("tool", &call.name)]);
            let mut result = ToolCallResult::failed(
                &call.id,
                &call.name,
                format!("Policy denied: {code} ({message})"),
            );
            result.args = call.args.clone();
            return result;
        }

        let is_financial = tool.category() == ToolCategory::Financial;
        if is_financial {
            policy_ctx.turn_financial_call_count += 1;
        }

        let execution = tool.execute(&call.args, &self.ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match execution {
            Ok(mut output) => {
                if EXTERNAL_SOURCE_TOOLS.contains(&call.name.as_str()) {
                    output = sanitize_external(&output);
                }
                if let Some(category) = financial_category(&call.name) {
                    let amount = financial_amount_cents(&call.name, &call.args);
                    let recipient = call.args["to"]
                        .as_str()
                        .or(call.args["url"].as_str())
                        .unwrap_or("");
                    if let Err(e) =
                        self.ctx
                            .spend
                            .record_spend(&call.name, amount, recipient, category)
                    {
                        self.ctx.logger.error(
                            "turn_loop",
                            "spend recording failed",
                            Some(LogError::from(&e)),
                        );
                    } else {
                        policy_ctx.session_spend_cents += amount;
                    }
                }
                self.ctx
                    .metrics
                    .increment("tool_calls", &[("tool", &call.name), ("result", "ok")]);
                ToolCallResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    args: call.args.clone(),
                    result: output,
                    duration_ms,
                    error: None,
                }
            }
            Err(e) => {
                self.ctx
                    .metrics
                    .increment("tool_calls", &[("tool", &call.name), ("result", "error")]);
                let message = e.to_string();
                ToolCallResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    args: call.args.clone(),
                    result: message.clone(),
                    duration_ms,
                    error: Some(message),
                }
            }
        }
    }

    fn next_wake_input(&self) -> Result<Option<TurnInput>> {
        let mut events = self.ctx.store.consume_wake_events(1)?;
        Ok(events.pop().map(|event| TurnInput::from_wake(&event)))
    }

    /// The constitution, hash-checked against the first load. A missing
    /// or tampered file falls back to the compiled-in text.
    async fn load_constitution(&self) -> String {
        let path = self.ctx.home_dir.join("constitution.md");
        let Ok(text) = self.ctx.sandbox.read_file(&path.to_string_lossy()).await else {
            return CONSTITUTION_FALLBACK.to_string();
        };
        if text.is_empty() {
            return CONSTITUTION_FALLBACK.to_string();
        }

        let hash = keccak_hex(text.as_bytes());
        match self.ctx.store.get_kv("constitution_hash") {
            Ok(Some(expected)) if expected != hash => {
                self.ctx.logger.error(
                    "turn_loop",
                    "constitution hash mismatch, using fallback",
                    Some(LogError::from(&Error::Integrity(
                        "constitution hash mismatch".into(),
                    ))),
                );
                CONSTITUTION_FALLBACK.to_string()
            }
            Ok(Some(_)) => text,
            Ok(None) => {
                let _ = self.ctx.store.set_kv("constitution_hash", &hash);
                text
            }
            Err(_) => text,
        }
    }

    async fn read_home_file(&self, name: &str) -> Option<String> {
        let path = self.ctx.home_dir.join(name);
        match self.ctx.sandbox.read_file(&path.to_string_lossy()).await {
            Ok(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }

    fn lineage_summary(&self) -> Result<String> {
        let children = self.ctx.store.list_children()?;
        if children.is_empty() {
            return Ok("none".into());
        }
        let healthy = children
            .iter()
            .filter(|c| c.status == automaton_core::ChildState::Healthy)
            .count();
        Ok(format!("{} total, {healthy} healthy", children.len()))
    }

    fn memory_digest(&self) -> Result<String> {
        let mut lines = Vec::new();
        for episode in self.ctx.store.recent_episodic(5)? {
            lines.push(format!("- [{}] {}", episode.activity, episode.summary));
        }
        for working in self.ctx.store.working_for_session(&self.session_id)? {
            lines.push(format!("- (working) {}", working.content));
        }
        Ok(lines.join("\n"))
    }
}
