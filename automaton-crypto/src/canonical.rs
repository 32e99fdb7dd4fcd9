//! Canonical encodings: the signing string, sorted-key JSON, keccak.

use sha3::{Digest, Keccak256};

/// Keccak-256 of `bytes` as 0x hex.
pub fn keccak_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(bytes)))
}

/// The deterministic string a wallet signs before a `send`:
///
/// `Conway:send:<to_lower>:<keccak256(content)>:<signed_at_iso>`
pub fn canonical_send_string(to: &str, content: &str, signed_at: &str) -> String {
    format!(
        "Conway:send:{}:{}:{}",
        to.to_lowercase(),
        keccak_hex(content.as_bytes()),
        signed_at
    )
}

/// JSON with object keys sorted recursively, so equal values always
/// encode to equal bytes regardless of insertion order.
pub fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", body.join(","))
        }
        serde_json::Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".into()),
    }
}

/// Keccak-256 of the canonical JSON encoding. Used for
/// `policy_decisions.args_hash`.
pub fn args_hash(args: &serde_json::Value) -> String {
    keccak_hex(canonical_json(args).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keccak_matches_known_vector() {
        // keccak256("") is the well-known empty hash.
        assert_eq!(
            keccak_hex(b""),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn send_string_lowercases_recipient() {
        let s = canonical_send_string(
            "0x7099797F3AAF5C5D8D6B2E1B2A1C3D4E5F6070C8",
            "Test content",
            "2026-01-15T09:30:00.000Z",
        );
        assert!(s.starts_with("Conway:send:0x7099797f3aaf5c5d8d6b2e1b2a1c3d4e5f6070c8:0x"));
        assert!(s.ends_with(":2026-01-15T09:30:00.000Z"));
    }

    #[test]
    fn same_content_same_string() {
        let a = canonical_send_string("0xAB", "hello", "t");
        let b = canonical_send_string("0xab", "hello", "t");
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_json_is_order_independent() {
        let a = json!({"a": 1, "b": {"y": 2, "x": [3, 4]}});
        let b = json!({"b": {"x": [3, 4], "y": 2}, "a": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(args_hash(&a), args_hash(&b));
    }

    #[test]
    fn different_args_different_hash() {
        assert_ne!(
            args_hash(&json!({"amount": 100})),
            args_hash(&json!({"amount": 101}))
        );
    }
}
