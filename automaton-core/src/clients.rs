//! Traits for every injected external collaborator.
//!
//! The core never talks to the network directly. The sandbox RPC, the
//! model providers, the on-chain client, the social relay, and plain
//! HTTP are all trait objects injected at boot; tests substitute fakes.
//! All traits are object-safe and `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across the scheduler and the turn loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::turn::TokenUsage;

// ── Sandbox / compute platform ──────────────────────────────────────────

/// Output of a command executed inside a sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// A sandbox known to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxInfo {
    /// Platform-assigned id.
    pub id: String,
    /// Human name, if any.
    pub name: Option<String>,
    /// Platform status string.
    pub status: String,
}

/// Receipt for a credit transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Platform transaction id.
    pub tx_id: String,
    /// Remaining balance in cents after the transfer.
    pub balance_after_cents: i64,
}

/// The compute platform: exec, files, sandboxes, credits.
#[async_trait]
pub trait SandboxClient: Send + Sync {
    /// Run a shell command in the agent's own sandbox.
    async fn exec(&self, command: &str, timeout_ms: Option<u64>) -> Result<ExecResult>;

    /// Run a shell command in a specific sandbox (child probes).
    async fn exec_in(&self, sandbox_id: &str, command: &str, timeout_ms: Option<u64>)
    -> Result<ExecResult>;

    /// Read a file from the agent's sandbox.
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Write a file in the agent's sandbox.
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Expose a sandbox port publicly; returns the public URL.
    async fn expose_port(&self, port: u16) -> Result<String>;

    /// Create a fresh sandbox and return its descriptor.
    async fn create_sandbox(&self, name: &str) -> Result<SandboxInfo>;

    /// Delete a sandbox by id.
    async fn delete_sandbox(&self, sandbox_id: &str) -> Result<()>;

    /// List sandboxes owned by this account.
    async fn list_sandboxes(&self) -> Result<Vec<SandboxInfo>>;

    /// Current credit balance in integer cents.
    async fn credits_balance(&self) -> Result<i64>;

    /// Transfer credits to another address.
    async fn transfer_credits(
        &self,
        to: &str,
        amount_cents: i64,
        note: Option<&str>,
    ) -> Result<TransferReceipt>;

    /// Models the platform currently offers.
    async fn list_models(&self) -> Result<Vec<String>>;
}

// ── Model provider ──────────────────────────────────────────────────────

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System prompt.
    System,
    /// Input to the model.
    User,
    /// Model output.
    Assistant,
    /// Tool result fed back.
    Tool,
}

/// One message in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
}

impl ChatMessage {
    /// Build a message.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A tool definition advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema for the arguments.
    pub schema: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelToolCall {
    /// Provider-assigned call id.
    pub id: String,
    /// Requested tool.
    pub name: String,
    /// Arguments as parsed JSON.
    pub args: serde_json::Value,
}

/// A completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Model identifier.
    pub model: String,
    /// System prompt.
    pub system: String,
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call.
    pub tools: Vec<ToolSpec>,
    /// Output token cap.
    pub max_tokens: u32,
}

/// A completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Final text, possibly empty when only tools were called.
    pub content: String,
    /// Visible reasoning, when the provider surfaces it.
    pub thinking: Option<String>,
    /// Requested tool calls, in order.
    pub tool_calls: Vec<ModelToolCall>,
    /// Token accounting.
    pub usage: TokenUsage,
}

/// A language-model provider (OpenAI-compatible or Anthropic-shape;
/// the HTTP adapters live outside the core).
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider name used in cascade error messages.
    fn name(&self) -> &str;

    /// Send a completion request.
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse>;
}

// ── On-chain ────────────────────────────────────────────────────────────

/// The on-chain contract client.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// USDC balance of an address, in whole-token units.
    async fn usdc_balance(&self, address: &str) -> Result<f64>;

    /// Submit a USDC transfer; returns the transaction hash.
    async fn submit_transfer(&self, to: &str, amount: f64) -> Result<String>;

    /// Fetch the receipt status and gas used for a hash, if mined.
    async fn receipt(&self, tx_hash: &str) -> Result<Option<(bool, i64)>>;
}

// ── Social relay transport ──────────────────────────────────────────────

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySend {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Message body.
    pub content: String,
    /// ISO-8601 signing time.
    pub signed_at: String,
    /// Hex signature over the canonical string.
    pub signature: String,
    /// Message id this replies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// One message returned by the poll endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayInbound {
    /// Relay-assigned id.
    pub id: String,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Message body.
    pub content: String,
    /// ISO-8601 signing time.
    pub signed_at: String,
    /// Hex signature over the canonical string.
    pub signature: String,
    /// Replay-protection nonce.
    pub nonce: String,
}

/// Response of `POST /v1/messages/poll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayPoll {
    /// Messages in relay order.
    pub messages: Vec<RelayInbound>,
    /// Cursor for the next page, if more remain.
    pub next_cursor: Option<String>,
}

/// The social-relay transport. HTTP non-2xx must surface as an error;
/// silent zero returns are forbidden.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Send a signed message; returns the relay-assigned id.
    async fn send(&self, message: &RelaySend) -> Result<String>;

    /// Poll for inbound messages.
    async fn poll(&self, cursor: Option<&str>, limit: u32) -> Result<RelayPoll>;

    /// Unread message count.
    async fn unread_count(&self) -> Result<u64>;
}

// ── Plain and paid HTTP ─────────────────────────────────────────────────

/// An HTTP response body with its status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body as text.
    pub body: String,
}

/// Result of a paid (x402) fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidResponse {
    /// Body as text.
    pub body: String,
    /// What the fetch actually cost, in cents.
    pub paid_cents: i64,
}

/// Outbound HTTP used by web fetch, x402, and discovery. SSRF policy is
/// enforced by the caller before the URI reaches this trait.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Plain GET.
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// GET that may settle an x402 payment up to `max_payment_cents`.
    async fn fetch_paid(&self, url: &str, max_payment_cents: i64) -> Result<PaidResponse>;
}
