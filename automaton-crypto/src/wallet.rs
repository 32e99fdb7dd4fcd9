//! secp256k1 wallet: key generation, address derivation, message signing.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::path::Path;

use automaton_core::{Error, Result};

/// The agent's signing wallet. The private key never leaves this type
/// except through [`Wallet::private_key_hex`] for persistence.
pub struct Wallet {
    key: SigningKey,
}

impl Wallet {
    /// Generate a fresh random wallet.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Restore a wallet from a hex private key (with or without `0x`).
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let stripped = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(stripped)
            .map_err(|e| Error::InvalidInput(format!("bad private key hex: {e}")))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| Error::InvalidInput(format!("bad private key: {e}")))?;
        Ok(Self { key })
    }

    /// The private key as bare hex (no `0x`).
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// The wallet's 0x address, lowercase: the last 20 bytes of the
    /// keccak-256 of the uncompressed public key.
    pub fn address(&self) -> String {
        address_of(self.key.verifying_key())
    }

    /// Sign a message with the Ethereum personal-message prefix.
    /// Returns a 65-byte `r || s || v` signature as 0x hex.
    pub fn sign_message(&self, message: &str) -> Result<String> {
        let digest = personal_digest(message);
        let (signature, recovery) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| Error::Integrity(format!("signing failed: {e}")))?;
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(27 + recovery.to_byte());
        Ok(format!("0x{}", hex::encode(bytes)))
    }

    /// Load from `wallet.json`, or generate and persist a new wallet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| Error::Integrity(format!("wallet file unreadable: {e}")))?;
            let file: WalletFile = serde_json::from_str(&raw)
                .map_err(|e| Error::Integrity(format!("wallet file corrupt: {e}")))?;
            return Self::from_hex(&file.private_key);
        }

        let wallet = Self::generate();
        let file = WalletFile {
            private_key: wallet.private_key_hex(),
            created_at: automaton_core::id::now_iso(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::Integrity(format!("wallet serialize failed: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| Error::Integrity(format!("wallet file unwritable: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::Integrity(format!("wallet chmod failed: {e}")))?;
        }
        Ok(wallet)
    }
}

/// On-disk shape of `wallet.json` (mode 0600).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFile {
    /// Bare-hex private key.
    pub private_key: String,
    /// ISO-8601 creation time.
    pub created_at: String,
}

/// Recover the signer address from a personal-message signature.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<String> {
    let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| Error::InvalidInput(format!("bad signature hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(Error::InvalidInput(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| Error::InvalidInput(format!("bad signature: {e}")))?;
    let v = bytes[64];
    let normalized = if v >= 27 { v - 27 } else { v };
    let recovery = RecoveryId::from_byte(normalized)
        .ok_or_else(|| Error::InvalidInput(format!("bad recovery byte: {v}")))?;

    let digest = personal_digest(message);
    let verifying = VerifyingKey::recover_from_prehash(&digest, &signature, recovery)
        .map_err(|e| Error::Integrity(format!("signature recovery failed: {e}")))?;
    Ok(address_of(&verifying))
}

fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

fn personal_digest(message: &str) -> [u8; 32] {
    let prefixed = format!(
        "\x19Ethereum Signed Message:\n{}{}",
        message.len(),
        message
    );
    Keccak256::digest(prefixed.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_lowercase_0x40() {
        let wallet = Wallet::generate();
        let address = wallet.address();
        assert!(automaton_core::validate::is_valid_address(&address));
        assert_eq!(address, address.to_lowercase());
    }

    #[test]
    fn hex_round_trip_preserves_address() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_hex(&wallet.private_key_hex()).unwrap();
        assert_eq!(wallet.address(), restored.address());

        let prefixed = Wallet::from_hex(&format!("0x{}", wallet.private_key_hex())).unwrap();
        assert_eq!(wallet.address(), prefixed.address());
    }

    #[test]
    fn sign_recovers_to_signer() {
        let wallet = Wallet::generate();
        let sig = wallet.sign_message("hello conway").unwrap();
        let recovered = recover_address("hello conway", &sig).unwrap();
        assert_eq!(recovered, wallet.address());
    }

    #[test]
    fn other_message_recovers_elsewhere() {
        let wallet = Wallet::generate();
        let sig = wallet.sign_message("hello conway").unwrap();
        let recovered = recover_address("tampered", &sig).unwrap();
        assert_ne!(recovered, wallet.address());
    }

    #[test]
    fn malformed_signatures_rejected() {
        assert!(recover_address("m", "0x1234").is_err());
        assert!(recover_address("m", "not-hex").is_err());
    }

    #[test]
    fn wallet_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");

        let first = Wallet::load_or_create(&path).unwrap();
        let second = Wallet::load_or_create(&path).unwrap();
        assert_eq!(first.address(), second.address());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
