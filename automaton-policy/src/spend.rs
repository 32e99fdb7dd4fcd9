//! Windowed spend tracking against the treasury policy.

use std::sync::Arc;

use automaton_core::{Result, SpendCategory, SpendRecord, TreasuryPolicy, new_id};
use automaton_state::StateStore;
use chrono::{Duration, Utc};

/// Answer to a limit check.
#[derive(Debug, Clone)]
pub struct LimitCheck {
    /// Whether the spend may proceed.
    pub allowed: bool,
    /// Why not, when refused.
    pub reason: Option<String>,
    /// Cents already spent in the current hour window.
    pub current_hourly_cents: i64,
    /// Cents already spent in the current day window.
    pub current_daily_cents: i64,
}

/// Records per-call spend and enforces per-category windows.
pub struct SpendTracker {
    store: Arc<StateStore>,
}

impl SpendTracker {
    /// Tracker over the shared store.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Record one outlay at the current instant.
    pub fn record_spend(
        &self,
        tool_name: &str,
        amount_cents: i64,
        recipient: &str,
        category: SpendCategory,
    ) -> Result<SpendRecord> {
        let now = automaton_core::id::now_iso();
        let record = SpendRecord {
            id: new_id(),
            tool_name: tool_name.into(),
            amount_cents,
            recipient: recipient.into(),
            category,
            window_hour: SpendRecord::hour_window(&now),
            window_day: SpendRecord::day_window(&now),
            created_at: now,
        };
        self.store.insert_spend(&record)?;
        Ok(record)
    }

    /// Cents spent in the current hour window for a category.
    pub fn hourly_spend(&self, category: SpendCategory) -> Result<i64> {
        let now = automaton_core::id::now_iso();
        Ok(self
            .store
            .hourly_spend(category, &SpendRecord::hour_window(&now))?)
    }

    /// Cents spent in the current day window for a category.
    pub fn daily_spend(&self, category: SpendCategory) -> Result<i64> {
        let now = automaton_core::id::now_iso();
        Ok(self
            .store
            .daily_spend(category, &SpendRecord::day_window(&now))?)
    }

    /// Whether spending `amount_cents` more in `category` stays inside
    /// both the hourly and daily caps.
    pub fn check_limit(
        &self,
        amount_cents: i64,
        category: SpendCategory,
        policy: &TreasuryPolicy,
    ) -> Result<LimitCheck> {
        let current_hourly = self.hourly_spend(category)?;
        let current_daily = self.daily_spend(category)?;
        let hourly_cap = policy.hourly_cap_cents(category);
        let daily_cap = policy.daily_cap_cents(category);

        if current_hourly + amount_cents > hourly_cap {
            return Ok(LimitCheck {
                allowed: false,
                reason: Some(format!(
                    "Hourly {category} limit: {current_hourly} + {amount_cents} exceeds {hourly_cap} cents"
                )),
                current_hourly_cents: current_hourly,
                current_daily_cents: current_daily,
            });
        }
        if current_daily + amount_cents > daily_cap {
            return Ok(LimitCheck {
                allowed: false,
                reason: Some(format!(
                    "Daily {category} limit: {current_daily} + {amount_cents} exceeds {daily_cap} cents"
                )),
                current_hourly_cents: current_hourly,
                current_daily_cents: current_daily,
            });
        }

        Ok(LimitCheck {
            allowed: true,
            reason: None,
            current_hourly_cents: current_hourly,
            current_daily_cents: current_daily,
        })
    }

    /// Delete records older than the policy's retention window.
    pub fn prune(&self, policy: &TreasuryPolicy) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(policy.retention_days);
        Ok(self
            .store
            .prune_spend(&automaton_core::id::to_iso(cutoff))?)
    }
}
