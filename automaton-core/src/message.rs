//! Inbox, on-chain transaction, and discovery cache records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of an inbound relay message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxStatus {
    /// Inserted by the poll task; signature already verified.
    Received,
    /// Picked up by the turn loop.
    InProgress,
    /// Handled.
    Processed,
    /// Gave up after `max_retries`.
    Failed,
}

impl fmt::Display for InboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::InProgress => "in_progress",
            Self::Processed => "processed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl InboxStatus {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(Self::Received),
            "in_progress" => Some(Self::InProgress),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A verified inbound agent-to-agent message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxMessage {
    /// Relay-assigned unique id.
    pub id: String,
    /// Sender address (signature-verified).
    pub from: String,
    /// Recipient address (this agent).
    pub to: String,
    /// Message body.
    pub content: String,
    /// ISO-8601 time the poll task stored it.
    pub received_at: String,
    /// Processing state.
    pub status: InboxStatus,
    /// Attempts so far.
    pub retry_count: i64,
    /// Attempts allowed before `failed`.
    pub max_retries: i64,
}

/// Status of a submitted on-chain transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Submitted, no receipt yet.
    Pending,
    /// Receipt shows success.
    Confirmed,
    /// Receipt shows revert or submission failed.
    Failed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl TxStatus {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A tracked on-chain operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnchainTx {
    /// ULID.
    pub id: String,
    /// Unique transaction hash.
    pub tx_hash: String,
    /// Chain identifier (e.g. `base`).
    pub chain: String,
    /// What the transaction does (e.g. `usdc_transfer`).
    pub operation: String,
    /// Current status.
    pub status: TxStatus,
    /// Gas used once confirmed.
    pub gas_used: Option<i64>,
    /// Free-form context.
    pub metadata: serde_json::Value,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

/// A cached agent card fetched from another agent's well-known endpoint.
///
/// Entries past `valid_until` are stale and must not satisfy queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredAgent {
    /// The agent's wallet address (cache key).
    pub agent_address: String,
    /// The card JSON as fetched.
    pub card: serde_json::Value,
    /// URI the card was fetched from.
    pub fetched_from: String,
    /// Keccak-256 of the card bytes.
    pub card_hash: String,
    /// ISO-8601 expiry.
    pub valid_until: String,
    /// How many times the card has been (re)fetched.
    pub fetch_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_status_round_trip() {
        for s in [
            InboxStatus::Received,
            InboxStatus::InProgress,
            InboxStatus::Processed,
            InboxStatus::Failed,
        ] {
            assert_eq!(InboxStatus::parse(&s.to_string()), Some(s));
        }
    }

    #[test]
    fn tx_status_round_trip() {
        for s in [TxStatus::Pending, TxStatus::Confirmed, TxStatus::Failed] {
            assert_eq!(TxStatus::parse(&s.to_string()), Some(s));
        }
    }
}
