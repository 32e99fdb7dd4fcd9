//! The per-tick context handed to every task.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use automaton_core::{
    AutomatonConfig, ChainClient, HttpClient, Identity, RelayClient, SandboxClient, SurvivalTier,
};
use automaton_lifecycle::{HealthMonitor, LifecycleManager};
use automaton_observe::{AlertEngine, Logger, MetricsCollector};
use automaton_policy::SpendTracker;
use automaton_state::StateStore;

/// Everything that outlives a tick: clients, collectors, the store.
/// Cheap to clone; all shared handles.
#[derive(Clone)]
pub struct TickDeps {
    /// Runtime configuration.
    pub config: Arc<AutomatonConfig>,
    /// Who this agent is.
    pub identity: Arc<Identity>,
    /// The state store.
    pub store: Arc<StateStore>,
    /// Compute platform client.
    pub sandbox: Arc<dyn SandboxClient>,
    /// On-chain client.
    pub chain: Arc<dyn ChainClient>,
    /// Social relay, when configured.
    pub relay: Option<Arc<dyn RelayClient>>,
    /// Outbound HTTP.
    pub http: Arc<dyn HttpClient>,
    /// Structured logger.
    pub logger: Logger,
    /// Process-lifetime metrics.
    pub metrics: Arc<MetricsCollector>,
    /// Process-lifetime alert engine.
    pub alerts: Arc<AlertEngine>,
    /// Child lifecycle manager.
    pub lifecycle: Arc<LifecycleManager>,
    /// Child health monitor.
    pub health: Arc<HealthMonitor>,
    /// Spend tracker.
    pub spend: Arc<SpendTracker>,
}

/// One tick's view of the world. Balances are fetched exactly once per
/// tick and shared by every task through this context.
#[derive(Clone)]
pub struct TickContext {
    /// ULID of this tick.
    pub tick_id: String,
    /// When the tick started.
    pub started_at: DateTime<Utc>,
    /// Credit balance in cents, fetched once.
    pub credit_cents: i64,
    /// USDC balance, fetched once.
    pub usdc_balance: f64,
    /// Survival tier derived from the credit balance (with the
    /// dead-state grace period applied).
    pub tier: SurvivalTier,
    /// Shared dependencies.
    pub deps: TickDeps,
}
