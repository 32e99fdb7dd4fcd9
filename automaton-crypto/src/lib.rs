#![deny(missing_docs)]
//! # automaton-crypto — wallet, canonical signing, validation
//!
//! Every outbound agent-to-agent message is signed over a canonical
//! string before it touches the relay:
//!
//! ```text
//! Conway:send:<to_lower>:<keccak256(content)>:<signed_at_iso>
//! ```
//!
//! Verification reconstructs the same string and checks that the
//! recovered signer equals the claimed `from` address. Around that sit
//! the guard rails: address and size validation, a ±5-minute timestamp
//! window, a 100-sends-per-rolling-hour outbound limit, and nonce-based
//! replay protection with a 5-minute window.

mod canonical;
mod rate;
mod validate;
mod wallet;

pub use canonical::{args_hash, canonical_json, canonical_send_string, keccak_hex};
pub use rate::{NONCE_TTL_SECS, SendRateLimiter, nonce_dedup_key};
pub use validate::{
    MAX_CONTENT_LEN, MAX_SERIALIZED_LEN, MAX_TIMESTAMP_SKEW_SECS, validate_inbound,
    validate_outbound, verify_signed_message,
};
pub use wallet::{Wallet, WalletFile, recover_address};
