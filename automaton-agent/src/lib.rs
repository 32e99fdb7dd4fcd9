#![deny(missing_docs)]
//! # automaton-agent — the reasoning loop and its tools
//!
//! One turn: take the next wake event (or the waking transition),
//! assemble the layered system prompt under a token budget, call the
//! model (cascading through fallbacks), dispatch each requested tool
//! through the policy engine, record spend for the financial ones,
//! persist the whole turn in a single transaction, and hand it to
//! memory ingestion.
//!
//! Tool failures stay inside their own result rows; only a model
//! cascade with zero usable responses aborts the turn.

mod card;
mod context;
mod discovery;
mod model;
mod prompt;
mod reasoning;
mod sanitize;
pub mod tools;
mod turn;

pub use card::build_agent_card;
pub use context::build_messages;
pub use discovery::{AgentDiscovery, CARD_PATH, is_allowed_uri};
pub use model::{call_with_fallback, estimate_cost_cents};
pub use prompt::{PromptInputs, SkillSection, TOKEN_BUDGET, build_system_prompt};
pub use reasoning::parse_reasoning;
pub use sanitize::{EXTERNAL_SOURCE_TOOLS, sanitize_external};
pub use tools::{Tool, ToolCtx, ToolRegistry, builtin_tools};
pub use turn::{TurnInput, TurnRunner};
