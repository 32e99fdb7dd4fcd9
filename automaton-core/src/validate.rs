//! Address, genesis, and feedback validation.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address regex"));

static GENESIS_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("genesis name regex"));

/// Prompt-injection patterns rejected in genesis text fields.
static INJECTION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)---\s*(END|BEGIN)\s+(SPECIALIZATION|LINEAGE|TASK)",
        r"(?i)SYSTEM:\s",
        r"(?i)You are now",
        r"(?i)Ignore (all )?(previous|above)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("injection regex"))
    .collect()
});

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Maximum length of a genesis name.
pub const MAX_GENESIS_NAME_LEN: usize = 64;

/// Maximum length of a feedback comment.
pub const MAX_FEEDBACK_COMMENT_LEN: usize = 500;

/// Whether `s` is a well-formed, non-zero 0x address.
pub fn is_valid_address(s: &str) -> bool {
    ADDRESS_RE.is_match(s) && !s.eq_ignore_ascii_case(ZERO_ADDRESS)
}

/// Validate an address, with the failing value in the error.
pub fn validate_address(s: &str) -> Result<()> {
    if is_valid_address(s) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid address: {s:?}")))
    }
}

/// Validate a child's genesis name: 1–64 chars of `[A-Za-z0-9-]`.
pub fn validate_genesis_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_GENESIS_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "genesis name must be 1-{MAX_GENESIS_NAME_LEN} characters: {name:?}"
        )));
    }
    if !GENESIS_NAME_RE.is_match(name) {
        return Err(Error::InvalidInput(format!(
            "genesis name may only contain letters, digits, and dashes: {name:?}"
        )));
    }
    Ok(())
}

/// Reject prompt-injection patterns in a genesis text field.
pub fn validate_genesis_text(field: &str, text: &str) -> Result<()> {
    for re in INJECTION_RES.iter() {
        if re.is_match(text) {
            return Err(Error::InvalidInput(format!(
                "injection pattern in genesis {field}"
            )));
        }
    }
    Ok(())
}

/// Validate a feedback submission: score in 1..=5, comment at most 500 chars.
pub fn validate_feedback(score: i64, comment: &str) -> Result<()> {
    if !(1..=5).contains(&score) {
        return Err(Error::InvalidInput(format!(
            "feedback score must be 1-5, got {score}"
        )));
    }
    if comment.len() > MAX_FEEDBACK_COMMENT_LEN {
        return Err(Error::InvalidInput(format!(
            "feedback comment exceeds {MAX_FEEDBACK_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}
