#![deny(missing_docs)]
//! # automaton — umbrella crate
//!
//! A single import surface for the sovereign agent runtime. Re-exports
//! the member crates behind feature flags, plus a `prelude` for the
//! happy path.

#[cfg(feature = "runtime")]
pub use automaton_agent;
#[cfg(feature = "core")]
pub use automaton_core;
#[cfg(feature = "core")]
pub use automaton_crypto;
#[cfg(feature = "runtime")]
pub use automaton_heartbeat;
#[cfg(feature = "runtime")]
pub use automaton_lifecycle;
#[cfg(feature = "runtime")]
pub use automaton_memory;
#[cfg(feature = "core")]
pub use automaton_observe;
#[cfg(feature = "runtime")]
pub use automaton_policy;
#[cfg(feature = "core")]
pub use automaton_state;

/// Happy-path imports for assembling an agent.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use automaton_core::{
        AgentState, AgentTurn, AutomatonConfig, ChainClient, ChildState, Error, HttpClient,
        Identity, ModelClient, RelayClient, Result, SandboxClient, SurvivalTier, TreasuryPolicy,
    };

    #[cfg(feature = "core")]
    pub use automaton_crypto::{SendRateLimiter, Wallet};

    #[cfg(feature = "core")]
    pub use automaton_observe::{AlertEngine, Logger, MetricsCollector};

    #[cfg(feature = "core")]
    pub use automaton_state::StateStore;

    #[cfg(feature = "runtime")]
    pub use automaton_agent::{ToolCtx, ToolRegistry, TurnRunner, builtin_tools};

    #[cfg(feature = "runtime")]
    pub use automaton_heartbeat::{Scheduler, TickDeps, load_schedule, tasks::builtin_tasks};

    #[cfg(feature = "runtime")]
    pub use automaton_lifecycle::{HealthMonitor, LifecycleManager};

    #[cfg(feature = "runtime")]
    pub use automaton_policy::{PolicyEngine, SpendTracker, builtin_rules};
}
