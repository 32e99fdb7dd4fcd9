//! Shared fakes for tool and turn tests.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use automaton_core::clients::{
    ExecResult, HttpResponse, PaidResponse, RelayPoll, RelaySend, SandboxInfo, TransferReceipt,
};
use automaton_core::{
    AutomatonConfig, ChainClient, HttpClient, Identity, ModelClient, ModelRequest, ModelResponse,
    RelayClient, Result, SandboxClient, TokenUsage, new_id,
};
use automaton_crypto::{SendRateLimiter, Wallet};
use automaton_lifecycle::LifecycleManager;
use automaton_observe::{Logger, LogLevel, MetricsCollector};
use automaton_policy::SpendTracker;
use automaton_state::StateStore;

use crate::discovery::AgentDiscovery;
use crate::tools::ToolCtx;

pub struct FakeSandbox;

#[async_trait]
impl SandboxClient for FakeSandbox {
    async fn exec(&self, command: &str, _: Option<u64>) -> Result<ExecResult> {
        Ok(ExecResult {
            exit_code: 0,
            stdout: format!("ran: {command}"),
            stderr: String::new(),
        })
    }
    async fn exec_in(&self, _: &str, command: &str, _: Option<u64>) -> Result<ExecResult> {
        Ok(ExecResult {
            exit_code: 0,
            stdout: format!("ran: {command}"),
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
        Ok(format!("https://sbx-{port}.example.com"))
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
        Ok(900)
    }
    async fn transfer_credits(&self, _: &str, _: i64, _: Option<&str>) -> Result<TransferReceipt> {
        Ok(TransferReceipt {
            tx_id: new_id(),
            balance_after_cents: 750,
        })
    }
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["claude-sonnet-4-5".into()])
    }
}

pub struct FakeChain;

#[async_trait]
impl ChainClient for FakeChain {
    async fn usdc_balance(&self, _: &str) -> Result<f64> {
        Ok(3.0)
    }
    async fn submit_transfer(&self, _: &str, _: f64) -> Result<String> {
        Ok("0xtx".into())
    }
    async fn receipt(&self, _: &str) -> Result<Option<(bool, i64)>> {
        Ok(None)
    }
}

pub struct FakeHttp;

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, _: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: r#"{"type":"agent-card","name":"peer"}"#.into(),
        })
    }
    async fn fetch_paid(&self, _: &str, max_payment_cents: i64) -> Result<PaidResponse> {
        Ok(PaidResponse {
            body: "paid data".into(),
            paid_cents: max_payment_cents.min(5),
        })
    }
}

pub struct FakeRelay;

#[async_trait]
impl RelayClient for FakeRelay {
    async fn send(&self, _: &RelaySend) -> Result<String> {
        Ok(new_id())
    }
    async fn poll(&self, _: Option<&str>, _: u32) -> Result<RelayPoll> {
        Ok(RelayPoll {
            messages: vec![],
            next_cursor: None,
        })
    }
    async fn unread_count(&self) -> Result<u64> {
        Ok(0)
    }
}

/// A model that always answers with fixed tool calls, then plain text.
pub struct ScriptedModel {
    pub responses: std::sync::Mutex<Vec<ModelResponse>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }
    async fn chat(&self, _: ModelRequest) -> Result<ModelResponse> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(ModelResponse {
                content: "done".into(),
                thinking: None,
                tool_calls: vec![],
                usage: TokenUsage::default(),
            });
        }
        Ok(responses.remove(0))
    }
}

pub fn tool_ctx() -> ToolCtx {
    build_ctx(None)
}

pub fn tool_ctx_with_relay() -> ToolCtx {
    build_ctx(Some(Arc::new(FakeRelay)))
}

fn build_ctx(relay: Option<Arc<dyn RelayClient>>) -> ToolCtx {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let home_dir = dir.path().to_path_buf();
    // The tests need the directory for the ctx's whole life.
    std::mem::forget(dir);

    let store = Arc::new(StateStore::open_in_memory().unwrap());
    let wallet = Arc::new(Wallet::generate());
    let identity = Arc::new(Identity {
        address: wallet.address(),
        creator_address: "0x2222222222222222222222222222222222222222".into(),
        wallet_private_key: wallet.private_key_hex(),
        sandbox_id: "sbx-self".into(),
        created_at: automaton_core::id::now_iso(),
    });
    let http: Arc<dyn HttpClient> = Arc::new(FakeHttp);

    ToolCtx {
        config: Arc::new(RwLock::new(AutomatonConfig::default())),
        config_path,
        home_dir,
        identity,
        store: store.clone(),
        sandbox: Arc::new(FakeSandbox),
        chain: Arc::new(FakeChain),
        relay,
        http: http.clone(),
        wallet,
        logger: Logger::with_sinks(LogLevel::Debug, vec![]),
        metrics: Arc::new(MetricsCollector::new()),
        lifecycle: Arc::new(LifecycleManager::new(store.clone())),
        spend: Arc::new(SpendTracker::new(store.clone())),
        rate_limiter: Arc::new(SendRateLimiter::default()),
        discovery: Arc::new(AgentDiscovery::new(store, http)),
    }
}
