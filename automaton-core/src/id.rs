//! Identifier and timestamp helpers.
//!
//! Every entity id in the store is a ULID: lexicographically sortable,
//! collision-free within a process, and cheap to mint. Timestamps are
//! UTC ISO-8601 strings with millisecond precision so that the spend
//! tracker can slice them by prefix (`YYYY-MM-DDThh` / `YYYY-MM-DD`).

use chrono::{DateTime, SecondsFormat, Utc};
use ulid::Ulid;

/// Mint a new ULID string.
pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Current UTC time as an ISO-8601 string (`YYYY-MM-DDTHH:MM:SS.sssZ`).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format an explicit instant the same way [`now_iso`] does.
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 timestamp produced by this runtime.
///
/// Tolerates both the canonical `YYYY-MM-DDTHH:MM:SS.sssZ` form and the
/// space-separated `YYYY-MM-DD HH:MM:SS` form that older rows carry.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
