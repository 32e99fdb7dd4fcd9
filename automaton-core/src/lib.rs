#![deny(missing_docs)]
//! # automaton-core — types and protocol traits for the automaton runtime
//!
//! The automaton is a single long-running process that owns a wallet, pays
//! for its own compute, and drives a language model in a reasoning loop.
//! This crate holds everything the other crates agree on:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`state`] | Agent state machine, survival tiers |
//! | [`turn`] | Turn, tool-call, and reasoning-step records |
//! | [`child`] | Child lifecycle states and the legal transition table |
//! | [`heartbeat`] | Schedule, history, dedup, and wake-event records |
//! | [`policy`] | Risk levels, tool categories, policy decision records |
//! | [`spend`] | Spend categories and records |
//! | [`message`] | Inbox, on-chain tx, and discovery records |
//! | [`memory`] | Tiered memory records |
//! | [`clients`] | Traits for every injected external collaborator |
//! | [`config`] | Runtime configuration |
//! | [`error`] | The error taxonomy shared by all crates |
//! | [`validate`] | Address, genesis, and feedback validation |
//!
//! External side effects never happen directly: the sandbox RPC, the model
//! providers, the on-chain client, and the social relay are all traits in
//! [`clients`], injected at boot. The core stays testable with fakes.

pub mod child;
pub mod clients;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod id;
pub mod identity;
pub mod memory;
pub mod message;
pub mod policy;
pub mod spend;
pub mod state;
pub mod turn;
pub mod validate;

pub use child::{Child, ChildLifecycleEvent, ChildState};
pub use clients::{
    ChainClient, ChatMessage, ChatRole, ExecResult, HttpClient, HttpResponse, ModelClient,
    ModelRequest, ModelResponse, ModelToolCall, PaidResponse, RelayClient, RelayInbound,
    RelayPoll, RelaySend, SandboxClient, SandboxInfo, ToolSpec, TransferReceipt,
};
pub use config::{AutomatonConfig, ModelStrategy, SoulConfig, TreasuryPolicy};
pub use error::{Error, Result};
pub use heartbeat::{HeartbeatSchedule, HeartbeatHistoryRow, TaskResult, WakeEvent};
pub use id::new_id;
pub use identity::Identity;
pub use message::{DiscoveredAgent, InboxMessage, InboxStatus, OnchainTx, TxStatus};
pub use policy::{PolicyAction, PolicyDecision, RiskLevel, ToolCategory};
pub use spend::{SpendCategory, SpendRecord};
pub use state::{AgentState, SurvivalTier};
pub use turn::{AgentTurn, InputSource, OodaPhase, ReasoningStep, TokenUsage, ToolCallResult};
