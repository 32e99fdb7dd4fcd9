//! The validation pipeline applied to both message directions.

use chrono::Utc;

use automaton_core::clients::{RelayInbound, RelaySend};
use automaton_core::id::parse_iso;
use automaton_core::validate::validate_address;
use automaton_core::{Error, Result};

use crate::canonical::canonical_send_string;
use crate::wallet::recover_address;

/// Maximum message content length (64 KiB).
pub const MAX_CONTENT_LEN: usize = 64 * 1024;

/// Maximum total serialized message size (128 KiB).
pub const MAX_SERIALIZED_LEN: usize = 128 * 1024;

/// Accepted clock skew on `signed_at`, in seconds (±5 minutes).
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 5 * 60;

fn validate_common(from: &str, to: &str, content: &str, signed_at: &str) -> Result<()> {
    validate_address(from)?;
    validate_address(to)?;

    if content.len() > MAX_CONTENT_LEN {
        return Err(Error::InvalidInput(format!(
            "content exceeds {MAX_CONTENT_LEN} bytes"
        )));
    }

    let signed = parse_iso(signed_at)
        .ok_or_else(|| Error::InvalidInput(format!("bad signed_at: {signed_at:?}")))?;
    let skew = (Utc::now() - signed).num_seconds().abs();
    if skew > MAX_TIMESTAMP_SKEW_SECS {
        return Err(Error::InvalidInput(format!(
            "signed_at outside the {MAX_TIMESTAMP_SKEW_SECS}s window ({skew}s off)"
        )));
    }
    Ok(())
}

fn validate_serialized_len(len: usize) -> Result<()> {
    if len > MAX_SERIALIZED_LEN {
        return Err(Error::InvalidInput(format!(
            "serialized message exceeds {MAX_SERIALIZED_LEN} bytes"
        )));
    }
    Ok(())
}

/// Check that `signature` over the canonical string resolves to `from`.
pub fn verify_signed_message(
    from: &str,
    to: &str,
    content: &str,
    signed_at: &str,
    signature: &str,
) -> Result<()> {
    let canonical = canonical_send_string(to, content, signed_at);
    let recovered = recover_address(&canonical, signature)?;
    if recovered.eq_ignore_ascii_case(from) {
        Ok(())
    } else {
        Err(Error::Integrity(format!(
            "signature resolves to {recovered}, claimed {from}"
        )))
    }
}

/// Full pipeline for a message this agent is about to send.
pub fn validate_outbound(message: &RelaySend) -> Result<()> {
    validate_common(
        &message.from,
        &message.to,
        &message.content,
        &message.signed_at,
    )?;
    let serialized = serde_json::to_string(message)
        .map_err(|e| Error::InvalidInput(format!("unserializable message: {e}")))?;
    validate_serialized_len(serialized.len())?;
    verify_signed_message(
        &message.from,
        &message.to,
        &message.content,
        &message.signed_at,
        &message.signature,
    )
}

/// Full pipeline for a message pulled from the relay. Replay protection
/// (the nonce window) is the caller's second step, against the dedup
/// table.
pub fn validate_inbound(message: &RelayInbound) -> Result<()> {
    validate_common(
        &message.from,
        &message.to,
        &message.content,
        &message.signed_at,
    )?;
    let serialized = serde_json::to_string(message)
        .map_err(|e| Error::InvalidInput(format!("unserializable message: {e}")))?;
    validate_serialized_len(serialized.len())?;
    verify_signed_message(
        &message.from,
        &message.to,
        &message.content,
        &message.signed_at,
        &message.signature,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn signed_send(wallet: &Wallet, to: &str, content: &str) -> RelaySend {
        let signed_at = automaton_core::id::now_iso();
        let canonical = canonical_send_string(to, content, &signed_at);
        RelaySend {
            from: wallet.address(),
            to: to.into(),
            content: content.into(),
            signed_at,
            signature: wallet.sign_message(&canonical).unwrap(),
            reply_to: None,
        }
    }

    #[test]
    fn round_trip_verifies() {
        let wallet = Wallet::generate();
        let msg = signed_send(
            &wallet,
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "Test content",
        );
        assert!(validate_outbound(&msg).is_ok());
    }

    #[test]
    fn wrong_claimed_sender_fails() {
        let wallet = Wallet::generate();
        let mut msg = signed_send(
            &wallet,
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "Test content",
        );
        msg.from = "0x1111111111111111111111111111111111111111".into();
        assert!(matches!(
            validate_outbound(&msg),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn tampered_content_fails() {
        let wallet = Wallet::generate();
        let mut msg = signed_send(
            &wallet,
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "Test content",
        );
        msg.content = "Other content".into();
        assert!(validate_outbound(&msg).is_err());
    }

    #[test]
    fn oversized_content_rejected_before_crypto() {
        let wallet = Wallet::generate();
        let msg = signed_send(
            &wallet,
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            &"x".repeat(MAX_CONTENT_LEN + 1),
        );
        assert!(matches!(
            validate_outbound(&msg),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let wallet = Wallet::generate();
        let to = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
        let signed_at = "2020-01-01T00:00:00.000Z".to_string();
        let canonical = canonical_send_string(to, "late", &signed_at);
        let msg = RelaySend {
            from: wallet.address(),
            to: to.into(),
            content: "late".into(),
            signed_at,
            signature: wallet.sign_message(&canonical).unwrap(),
            reply_to: None,
        };
        assert!(validate_outbound(&msg).is_err());
    }

    #[test]
    fn zero_address_rejected() {
        let wallet = Wallet::generate();
        let msg = signed_send(
            &wallet,
            "0x0000000000000000000000000000000000000000",
            "hi",
        );
        assert!(validate_outbound(&msg).is_err());
    }
}
