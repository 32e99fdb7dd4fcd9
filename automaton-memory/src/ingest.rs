//! The ingestion pipeline. Best-effort, step by step.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use automaton_core::memory::{EpisodicMemory, SemanticMemory, WorkingMemory};
use automaton_core::{AgentTurn, InputSource, new_id};
use automaton_state::StateStore;

use crate::classify::classify_turn;

/// Per-session bound on working-memory entries.
pub const WORKING_MEMORY_CAP: usize = 20;

static ADDRESS_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[0-9a-fA-F]{40}").expect("address regex"));

/// Writes memory tiers after each turn. Every step is isolated; any
/// failure logs and the pipeline continues.
pub struct MemoryIngestor {
    store: Arc<StateStore>,
}

impl MemoryIngestor {
    /// Ingestor over the shared store.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Run the pipeline for a completed turn. Never returns an error.
    pub fn ingest(&self, turn: &AgentTurn, session_id: &str) {
        let activity = classify_turn(turn);
        let now = automaton_core::id::now_iso();

        // 1. Episodic: what happened.
        let summary = summarize(turn);
        if let Err(e) = self.store.insert_episodic(&EpisodicMemory {
            id: new_id(),
            turn_id: turn.id.clone(),
            activity,
            summary,
            importance: activity.importance(),
            created_at: now.clone(),
        }) {
            tracing::warn!(error = %e, "episodic ingestion failed");
        }

        // 2. Semantic: durable facts from specific tool outputs.
        for call in &turn.tool_calls {
            if call.error.is_some() {
                continue;
            }
            let fact = match call.name.as_str() {
                "check_credits" => Some(("finance", "credits_balance".to_string())),
                "discover_agent" => call.args["address"]
                    .as_str()
                    .map(|a| ("agents", a.to_lowercase())),
                "check_child_health" => Some(("system", "child_health".to_string())),
                _ => None,
            };
            if let Some((category, key)) = fact {
                if let Err(e) = self.store.upsert_semantic(&SemanticMemory {
                    id: new_id(),
                    category: category.into(),
                    key,
                    value: truncate(&call.result, 500),
                    confidence: 0.9,
                    updated_at: now.clone(),
                }) {
                    tracing::warn!(error = %e, tool = %call.name, "semantic ingestion failed");
                }
            }
        }

        // 3. Relationships: outbound sends and inbound messages.
        for call in &turn.tool_calls {
            if call.name == "send_message" && call.error.is_none() {
                if let Some(to) = call.args["to"].as_str() {
                    if let Err(e) =
                        self.store
                            .touch_relationship(&new_id(), &to.to_lowercase(), &now)
                    {
                        tracing::warn!(error = %e, "relationship ingestion failed");
                    }
                }
            }
        }
        if turn.input_source == Some(InputSource::Agent) {
            if let Some(input) = &turn.input {
                for found in ADDRESS_IN_TEXT.find_iter(input).take(5) {
                    if let Err(e) = self.store.touch_relationship(
                        &new_id(),
                        &found.as_str().to_lowercase(),
                        &now,
                    ) {
                        tracing::warn!(error = %e, "relationship ingestion failed");
                    }
                }
            }
        }

        // 4. Working memory: sleep observations and self-mod decisions.
        for call in &turn.tool_calls {
            let priority = match call.name.as_str() {
                "reflect_soul" | "update_worklog" => 5,
                "sleep" => 1,
                _ => continue,
            };
            if let Err(e) = self.store.insert_working(&WorkingMemory {
                id: new_id(),
                session_id: session_id.into(),
                content: format!("{}: {}", call.name, truncate(&call.result, 300)),
                priority,
                created_at: now.clone(),
            }) {
                tracing::warn!(error = %e, "working ingestion failed");
            }
        }

        // 5. Trim.
        if let Err(e) = self.store.trim_working(session_id, WORKING_MEMORY_CAP) {
            tracing::warn!(error = %e, "working memory trim failed");
        }
    }
}

fn summarize(turn: &AgentTurn) -> String {
    if !turn.thinking.is_empty() {
        return truncate(&turn.thinking, 200);
    }
    if turn.tool_calls.is_empty() {
        return "idle turn".into();
    }
    let names: Vec<&str> = turn.tool_calls.iter().map(|c| c.name.as_str()).collect();
    format!("ran {}", names.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}
