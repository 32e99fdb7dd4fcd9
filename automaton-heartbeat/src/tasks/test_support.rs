//! Shared fakes for scheduler and task tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use automaton_core::clients::{
    ExecResult, HttpResponse, PaidResponse, RelayInbound, RelayPoll, RelaySend, SandboxInfo,
    TransferReceipt,
};
use automaton_core::{
    AutomatonConfig, ChainClient, HttpClient, Identity, RelayClient, Result, SandboxClient,
    SurvivalTier, new_id,
};
use automaton_lifecycle::{HealthMonitor, LifecycleManager};
use automaton_observe::{AlertEngine, AlertRule, AlertSeverity, Logger, LogLevel, MetricsCollector};
use automaton_policy::SpendTracker;
use automaton_state::StateStore;

use crate::context::{TickContext, TickDeps};
use crate::scheduler::{HeartbeatTask, TaskOutcome};

pub struct FakeSandbox {
    pub balance_cents: i64,
    pub exec_output: String,
}

#[async_trait]
impl SandboxClient for FakeSandbox {
    async fn exec(&self, _: &str, _: Option<u64>) -> Result<ExecResult> {
        Ok(ExecResult {
            exit_code: 0,
            stdout: self.exec_output.clone(),
            stderr: String::new(),
        })
    }
    async fn exec_in(&self, _: &str, _: &str, _: Option<u64>) -> Result<ExecResult> {
        Ok(ExecResult {
            exit_code: 0,
            stdout: r#"{"status":"healthy"}"#.into(),
            stderr: String::new(),
        })
    }
    async fn read_file(&self, _: &str) -> Result<String> {
        Ok(String::new())
    }
    async fn write_file(&self, _: &str, _: &str) -> Result<()> {
        Ok(())
    }
    async fn expose_port(&self, port: u16) -> Result<String> {
        Ok(format!("https://sbx-self-{port}.sandbox.example.com"))
    }
    async fn create_sandbox(&self, name: &str) -> Result<SandboxInfo> {
        Ok(SandboxInfo {
            id: format!("sbx-{name}"),
            name: Some(name.into()),
            status: "running".into(),
        })
    }
    async fn delete_sandbox(&self, _: &str) -> Result<()> {
        Ok(())
    }
    async fn list_sandboxes(&self) -> Result<Vec<SandboxInfo>> {
        Ok(vec![])
    }
    async fn credits_balance(&self) -> Result<i64> {
        Ok(self.balance_cents)
    }
    async fn transfer_credits(&self, _: &str, _: i64, _: Option<&str>) -> Result<TransferReceipt> {
        Ok(TransferReceipt {
            tx_id: new_id(),
            balance_after_cents: self.balance_cents,
        })
    }
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["claude-sonnet-4-5".into(), "claude-haiku-4-5".into()])
    }
}

pub struct FakeChain;

#[async_trait]
impl ChainClient for FakeChain {
    async fn usdc_balance(&self, _: &str) -> Result<f64> {
        Ok(12.5)
    }
    async fn submit_transfer(&self, _: &str, _: f64) -> Result<String> {
        Ok(format!("0x{}", new_id().to_lowercase()))
    }
    async fn receipt(&self, _: &str) -> Result<Option<(bool, i64)>> {
        Ok(Some((true, 21_000)))
    }
}

pub struct FakeHttp;

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, _: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: "{}".into(),
        })
    }
    async fn fetch_paid(&self, _: &str, _: i64) -> Result<PaidResponse> {
        Ok(PaidResponse {
            body: "{}".into(),
            paid_cents: 0,
        })
    }
}

pub struct FakeRelay {
    pub inbound: Vec<RelayInbound>,
}

#[async_trait]
impl RelayClient for FakeRelay {
    async fn send(&self, _: &RelaySend) -> Result<String> {
        Ok(new_id())
    }
    async fn poll(&self, _: Option<&str>, _: u32) -> Result<RelayPoll> {
        Ok(RelayPoll {
            messages: self.inbound.clone(),
            next_cursor: Some("cursor-1".into()),
        })
    }
    async fn unread_count(&self) -> Result<u64> {
        Ok(self.inbound.len() as u64)
    }
}

pub fn deps_with_balance(balance_cents: i64) -> TickDeps {
    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let sandbox: Arc<dyn SandboxClient> = Arc::new(FakeSandbox {
        balance_cents,
        exec_output: String::new(),
    });
    let lifecycle = Arc::new(LifecycleManager::new(store.clone()));
    let health = Arc::new(HealthMonitor::new(lifecycle.clone(), sandbox.clone()));
    let alerts = Arc::new(AlertEngine::new(vec![AlertRule {
        name: "always".into(),
        severity: AlertSeverity::Warning,
        message: "test rule".into(),
        cooldown_ms: 999_999_999,
        condition: Box::new(|_| true),
    }]));

    TickDeps {
        config: Arc::new(AutomatonConfig::default()),
        identity: Arc::new(Identity {
            address: "0x1111111111111111111111111111111111111111".into(),
            creator_address: "0x2222222222222222222222222222222222222222".into(),
            wallet_private_key: String::new(),
            sandbox_id: "sbx-self".into(),
            created_at: automaton_core::id::now_iso(),
        }),
        store: store.clone(),
        sandbox,
        chain: Arc::new(FakeChain),
        relay: None,
        http: Arc::new(FakeHttp),
        logger: Logger::with_sinks(LogLevel::Debug, vec![]),
        metrics: Arc::new(MetricsCollector::new()),
        alerts,
        lifecycle,
        health,
        spend: Arc::new(SpendTracker::new(store)),
    }
}

pub fn context_with_balance(deps: TickDeps, credit_cents: i64) -> TickContext {
    TickContext {
        tick_id: new_id(),
        started_at: Utc::now(),
        credit_cents,
        usdc_balance: 12.5,
        tier: SurvivalTier::from_cents(credit_cents),
        deps,
    }
}

pub fn with_relay(mut deps: TickDeps, inbound: Vec<RelayInbound>) -> TickDeps {
    deps.relay = Some(Arc::new(FakeRelay { inbound }));
    deps
}

pub fn with_exec_output(mut deps: TickDeps, output: &str) -> TickDeps {
    let balance = 1_000;
    deps.sandbox = Arc::new(FakeSandbox {
        balance_cents: balance,
        exec_output: output.into(),
    });
    deps
}

pub fn with_config(
    mut deps: TickDeps,
    mutate: impl FnOnce(&mut AutomatonConfig),
) -> TickDeps {
    let mut config = (*deps.config).clone();
    mutate(&mut config);
    deps.config = Arc::new(config);
    deps
}

struct NoopTask {
    name: &'static str,
}

#[async_trait]
impl HeartbeatTask for NoopTask {
    fn name(&self) -> &'static str {
        self.name
    }
    async fn run(&self, _: &TickContext) -> Result<TaskOutcome> {
        Ok(TaskOutcome::quiet())
    }
}

struct WakeTask {
    name: &'static str,
    message: &'static str,
}

#[async_trait]
impl HeartbeatTask for WakeTask {
    fn name(&self) -> &'static str {
        self.name
    }
    async fn run(&self, _: &TickContext) -> Result<TaskOutcome> {
        Ok(TaskOutcome::wake(self.message))
    }
}

pub fn noop_task(name: &'static str) -> Arc<dyn HeartbeatTask> {
    Arc::new(NoopTask { name })
}

pub fn wake_task(name: &'static str, message: &'static str) -> Arc<dyn HeartbeatTask> {
    Arc::new(WakeTask { name, message })
}
