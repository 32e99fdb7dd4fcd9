#![deny(missing_docs)]
//! # automaton-policy — gate every tool call, cap every cent
//!
//! The policy engine sits between the model's tool requests and their
//! execution. Rules are evaluated in priority order; the first rule
//! that returns a non-allow action decides, and every decision (allow
//! or not) is persisted as a `policy_decisions` row with a canonical
//! hash of the arguments.
//!
//! The spend tracker records each financial outlay under
//! `(window_hour, window_day)` keys and answers limit checks against
//! the treasury policy's per-category caps.

mod builtin;
mod engine;
mod rule;
mod spend;

pub use builtin::{
    FORBIDDEN_COMMAND_PATTERNS, PROTECTED_FILES, builtin_rules, financial_amount_cents,
    financial_category,
};
pub use engine::{PolicyEngine, PolicyVerdict};
pub use rule::{PolicyRequest, PolicyRule, PolicyRuleResult, RuleSelector, TurnPolicyContext};
pub use spend::{LimitCheck, SpendTracker};
