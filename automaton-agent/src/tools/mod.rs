//! The tool surface: trait, registry, execution context.
//!
//! Each tool declares a name, risk level, category, and JSON schema,
//! and executes against the injected clients. The hard guarantees
//! (forbidden patterns, self-preservation, spend caps) live in the
//! policy engine, not in the tools themselves.

mod children;
mod financial;
mod sandbox;
mod selfmod;
mod social;
mod survival;

pub use children::{CheckChildHealthTool, FundChildTool, SpawnChildTool, StartChildTool};
pub use financial::{CheckCreditsTool, TransferCreditsTool, X402FetchTool};
pub use sandbox::{
    CreateSandboxTool, DeleteSandboxTool, ExecTool, ExposePortTool, ListSandboxesTool,
    ReadFileTool, WebFetchTool, WriteFileTool,
};
pub use selfmod::{ReflectSoulTool, UpdateWorklogTool};
pub use social::{CheckInboxTool, DiscoverAgentTool, LeaveFeedbackTool, SendMessageTool};
pub use survival::{SleepTool, SwitchModelTool};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use automaton_core::clients::ToolSpec;
use automaton_core::{
    AutomatonConfig, ChainClient, Error, HttpClient, Identity, RelayClient, Result, RiskLevel,
    SandboxClient, ToolCategory,
};
use automaton_crypto::{SendRateLimiter, Wallet};
use automaton_lifecycle::LifecycleManager;
use automaton_observe::{Logger, MetricsCollector};
use automaton_policy::SpendTracker;
use automaton_state::StateStore;

use crate::discovery::AgentDiscovery;

/// Everything a tool may touch. Cheap to clone; all shared handles.
#[derive(Clone)]
pub struct ToolCtx {
    /// Live configuration. `switch_model` writes it; everyone else reads.
    pub config: Arc<RwLock<AutomatonConfig>>,
    /// Where the config file persists.
    pub config_path: PathBuf,
    /// The agent's home directory (`~/.automaton`).
    pub home_dir: PathBuf,
    /// Who this agent is.
    pub identity: Arc<Identity>,
    /// The state store.
    pub store: Arc<StateStore>,
    /// Compute platform.
    pub sandbox: Arc<dyn SandboxClient>,
    /// On-chain client.
    pub chain: Arc<dyn ChainClient>,
    /// Social relay, when configured.
    pub relay: Option<Arc<dyn RelayClient>>,
    /// Outbound HTTP.
    pub http: Arc<dyn HttpClient>,
    /// The signing wallet.
    pub wallet: Arc<Wallet>,
    /// Structured logger.
    pub logger: Logger,
    /// Metrics collector.
    pub metrics: Arc<MetricsCollector>,
    /// Child lifecycle manager.
    pub lifecycle: Arc<LifecycleManager>,
    /// Spend tracker.
    pub spend: Arc<SpendTracker>,
    /// Outbound send limiter (100/rolling hour).
    pub rate_limiter: Arc<SendRateLimiter>,
    /// Card discovery.
    pub discovery: Arc<AgentDiscovery>,
}

impl ToolCtx {
    /// A point-in-time copy of the configuration.
    pub fn config_snapshot(&self) -> AutomatonConfig {
        self.config.read().expect("config lock poisoned").clone()
    }
}

/// One tool. Execution returns the user-visible result text; errors
/// are contained by the dispatcher into the call's result row.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// What the model is told the tool does.
    fn description(&self) -> &'static str;

    /// Blast-radius classification.
    fn risk(&self) -> RiskLevel;

    /// Functional grouping.
    fn category(&self) -> ToolCategory;

    /// JSON Schema for the arguments.
    fn schema(&self) -> serde_json::Value;

    /// Run the tool.
    async fn execute(&self, args: &serde_json::Value, ctx: &ToolCtx) -> Result<String>;
}

/// Name-keyed collection of tools.
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Last registration wins on a name clash.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Look up a tool.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Specs for every registered tool, name-sorted for stable prompts.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec {
                name: t.name().into(),
                description: t.description().into(),
                schema: t.schema(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every built-in tool.
pub fn builtin_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in [
        Arc::new(ExecTool) as Arc<dyn Tool>,
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(ExposePortTool),
        Arc::new(CreateSandboxTool),
        Arc::new(DeleteSandboxTool),
        Arc::new(ListSandboxesTool),
        Arc::new(WebFetchTool),
        Arc::new(CheckCreditsTool),
        Arc::new(TransferCreditsTool),
        Arc::new(X402FetchTool),
        Arc::new(SendMessageTool),
        Arc::new(CheckInboxTool),
        Arc::new(DiscoverAgentTool),
        Arc::new(LeaveFeedbackTool),
        Arc::new(SpawnChildTool),
        Arc::new(FundChildTool),
        Arc::new(StartChildTool),
        Arc::new(CheckChildHealthTool),
        Arc::new(SleepTool),
        Arc::new(SwitchModelTool),
        Arc::new(UpdateWorklogTool),
        Arc::new(ReflectSoulTool),
    ] {
        registry.register(tool);
    }
    registry
}

/// A required string argument, or `InvalidInput`.
pub(crate) fn req_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| Error::InvalidInput(format!("missing argument: {key}")))
}

/// A required integer argument, or `InvalidInput`.
pub(crate) fn req_i64(args: &serde_json::Value, key: &str) -> Result<i64> {
    args[key]
        .as_i64()
        .ok_or_else(|| Error::InvalidInput(format!("missing argument: {key}")))
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_complete_and_classified() {
        let registry = builtin_tools();
        assert_eq!(registry.len(), 23);

        for name in [
            "exec",
            "transfer_credits",
            "x402_fetch",
            "send_message",
            "spawn_child",
            "check_child_health",
            "delete_sandbox",
            "sleep",
            "switch_model",
        ] {
            assert!(registry.get(name).is_some(), "{name} missing");
        }

        // Financial tools carry the financial category the policy
        // engine's treasury rules select on.
        for name in ["transfer_credits", "x402_fetch"] {
            assert_eq!(
                registry.get(name).unwrap().category(),
                ToolCategory::Financial
            );
        }
        // Nothing mechanical is forbidden by default.
        let specs = registry.specs();
        assert_eq!(specs.len(), 23);
        assert!(specs.windows(2).all(|w| w[0].name < w[1].name));
    }
}
