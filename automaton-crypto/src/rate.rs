//! Outbound rate limiting and nonce replay keys.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

use automaton_core::{Error, Result};

/// How long an inbound nonce stays hot in the dedup table (5 minutes).
pub const NONCE_TTL_SECS: i64 = 5 * 60;

/// The dedup-table key for an inbound nonce.
pub fn nonce_dedup_key(nonce: &str) -> String {
    format!("social:nonce:{nonce}")
}

/// Rolling-window limiter for outbound sends: at most `max` per
/// `window`. Process-lifetime state, shared by every send path.
pub struct SendRateLimiter {
    max: usize,
    window: Duration,
    sends: Mutex<VecDeque<DateTime<Utc>>>,
}

impl SendRateLimiter {
    /// The production default: 100 sends per rolling hour.
    pub fn per_hour(max: usize) -> Self {
        Self {
            max,
            window: Duration::hours(1),
            sends: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a send at `now`, or refuse if the window is full.
    pub fn check_and_record(&self, now: DateTime<Utc>) -> Result<()> {
        let mut sends = self.sends.lock().expect("rate limiter lock poisoned");
        let horizon = now - self.window;
        while sends.front().is_some_and(|t| *t < horizon) {
            sends.pop_front();
        }
        if sends.len() >= self.max {
            return Err(Error::LimitExceeded(format!(
                "outbound send limit of {} per hour reached",
                self.max
            )));
        }
        sends.push_back(now);
        Ok(())
    }

    /// Sends currently inside the window.
    pub fn current_count(&self, now: DateTime<Utc>) -> usize {
        let sends = self.sends.lock().expect("rate limiter lock poisoned");
        let horizon = now - self.window;
        sends.iter().filter(|t| **t >= horizon).count()
    }
}

impl Default for SendRateLimiter {
    fn default() -> Self {
        Self::per_hour(100)
    }
}
