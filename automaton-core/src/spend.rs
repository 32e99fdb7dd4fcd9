//! Spend categories and records. All money is integer cents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The dimension along which spend caps are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendCategory {
    /// Direct credit transfers to other addresses.
    Transfer,
    /// Paid HTTP fetches.
    X402,
    /// Model usage.
    Inference,
    /// Anything else that costs money.
    Other,
}

impl fmt::Display for SpendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transfer => "transfer",
            Self::X402 => "x402",
            Self::Inference => "inference",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl SpendCategory {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(Self::Transfer),
            "x402" => Some(Self::X402),
            "inference" => Some(Self::Inference),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// One recorded outlay.
///
/// `window_hour` is the first 13 characters of the insertion timestamp
/// (`YYYY-MM-DDThh`), `window_day` the first 10 (`YYYY-MM-DD`); the limit
/// check sums by those keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendRecord {
    /// ULID.
    pub id: String,
    /// Tool that spent the money.
    pub tool_name: String,
    /// Amount in integer cents.
    pub amount_cents: i64,
    /// Recipient address or domain the money went to.
    pub recipient: String,
    /// Enforcement dimension.
    pub category: SpendCategory,
    /// `YYYY-MM-DDThh` bucket.
    pub window_hour: String,
    /// `YYYY-MM-DD` bucket.
    pub window_day: String,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

impl SpendRecord {
    /// Derive the hour window from an ISO timestamp.
    pub fn hour_window(iso: &str) -> String {
        iso.chars().take(13).collect()
    }

    /// Derive the day window from an ISO timestamp.
    pub fn day_window(iso: &str) -> String {
        iso.chars().take(10).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_slice_the_timestamp() {
        let iso = "2026-03-01T14:22:31.412Z";
        assert_eq!(SpendRecord::hour_window(iso), "2026-03-01T14");
        assert_eq!(SpendRecord::day_window(iso), "2026-03-01");
    }

    #[test]
    fn category_round_trip() {
        for c in [
            SpendCategory::Transfer,
            SpendCategory::X402,
            SpendCategory::Inference,
            SpendCategory::Other,
        ] {
            assert_eq!(SpendCategory::parse(&c.to_string()), Some(c));
        }
    }
}
