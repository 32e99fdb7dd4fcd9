//! Next-run computation for cron and interval schedules.

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;
use std::str::FromStr;

use automaton_core::{HeartbeatSchedule, SurvivalTier};

/// The `cron` crate wants a seconds field; schedule files use the
/// classic 5-field form. Prepend a zero-seconds field when needed.
pub fn normalize_cron(expr: &str) -> String {
    let fields = expr.split_whitespace().count();
    if fields == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

fn parse_cron(expr: &str) -> Option<Schedule> {
    Schedule::from_str(&normalize_cron(expr)).ok()
}

/// Compute when a task is next due after `now`.
///
/// Cron wins when present and parseable; the interval is the fallback.
/// At `low_compute` and below, interval tasks stretch by `multiplier`
/// and cron tasks skip to the multiplier-th occurrence.
pub fn next_run_after(
    row: &HeartbeatSchedule,
    now: DateTime<Utc>,
    tier: SurvivalTier,
    multiplier: u32,
) -> DateTime<Utc> {
    let stretch = if tier <= SurvivalTier::LowCompute {
        multiplier.max(1) as i64
    } else {
        1
    };

    if let Some(expr) = row.cron_expression.as_deref() {
        if let Some(schedule) = parse_cron(expr) {
            let mut upcoming = schedule.after(&now);
            let mut next = None;
            for _ in 0..stretch {
                next = upcoming.next();
            }
            if let Some(next) = next {
                return next;
            }
        }
    }

    let interval_ms = row.interval_ms.unwrap_or(60_000).max(1_000);
    now + Duration::milliseconds(interval_ms * stretch)
}

/// Rough period of a schedule, for idempotency bucketing.
pub(crate) fn approximate_period(row: &HeartbeatSchedule, now: DateTime<Utc>) -> Duration {
    if let Some(expr) = row.cron_expression.as_deref() {
        if let Some(schedule) = parse_cron(expr) {
            let mut upcoming = schedule.after(&now);
            if let (Some(a), Some(b)) = (upcoming.next(), upcoming.next()) {
                return b - a;
            }
        }
    }
    Duration::milliseconds(row.interval_ms.unwrap_or(60_000).max(1_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cron: Option<&str>, interval_ms: Option<i64>) -> HeartbeatSchedule {
        HeartbeatSchedule {
            task_name: "t".into(),
            cron_expression: cron.map(Into::into),
            interval_ms,
            priority: 0,
            timeout_ms: 1_000,
            tier_minimum: SurvivalTier::Critical,
            enabled: true,
            last_run_at: None,
            next_run_at: None,
            last_result: None,
            last_error: None,
            run_count: 0,
            fail_count: 0,
            lease_owner: None,
            lease_expires_at: None,
            params: serde_json::Value::Null,
        }
    }

    fn at(iso: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn five_field_cron_gains_seconds() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron("0 */6 * * * *"), "0 */6 * * * *");
    }

    #[test]
    fn cron_wins_over_interval() {
        let row = row(Some("*/5 * * * *"), Some(1_000));
        let now = at("2026-01-15T09:02:10Z");
        let next = next_run_after(&row, now, SurvivalTier::Normal, 4);
        assert_eq!(next, at("2026-01-15T09:05:00Z"));
    }

    #[test]
    fn unparseable_cron_falls_back_to_interval() {
        let row = row(Some("not a cron"), Some(120_000));
        let now = at("2026-01-15T09:00:00Z");
        let next = next_run_after(&row, now, SurvivalTier::Normal, 4);
        assert_eq!(next, at("2026-01-15T09:02:00Z"));
    }

    #[test]
    fn low_compute_stretches_intervals() {
        let row = row(None, Some(60_000));
        let now = at("2026-01-15T09:00:00Z");
        assert_eq!(
            next_run_after(&row, now, SurvivalTier::Normal, 4),
            at("2026-01-15T09:01:00Z")
        );
        assert_eq!(
            next_run_after(&row, now, SurvivalTier::LowCompute, 4),
            at("2026-01-15T09:04:00Z")
        );
        assert_eq!(
            next_run_after(&row, now, SurvivalTier::Critical, 4),
            at("2026-01-15T09:04:00Z")
        );
    }

    #[test]
    fn low_compute_skips_cron_occurrences() {
        let row = row(Some("*/5 * * * *"), None);
        let now = at("2026-01-15T09:00:00Z");
        let next = next_run_after(&row, now, SurvivalTier::LowCompute, 4);
        assert_eq!(next, at("2026-01-15T09:20:00Z"));
    }

    #[test]
    fn period_estimation() {
        let now = at("2026-01-15T09:00:00Z");
        assert_eq!(
            approximate_period(&row(Some("*/5 * * * *"), None), now),
            Duration::minutes(5)
        );
        assert_eq!(
            approximate_period(&row(None, Some(90_000)), now),
            Duration::milliseconds(90_000)
        );
    }
}
