//! The agent's own identity row. Exists exactly once per store.

use serde::{Deserialize, Serialize};

/// Who this agent is. Written at first boot, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// The agent's wallet address.
    pub address: String,
    /// The address recognised as owner for audit.
    pub creator_address: String,
    /// Hex-encoded secp256k1 private key. Also persisted in `wallet.json`
    /// with mode 0600.
    pub wallet_private_key: String,
    /// The sandbox this process runs in.
    pub sandbox_id: String,
    /// ISO-8601 bootstrap time.
    pub created_at: String,
}
