//! Alert rules evaluated over metric snapshots, with cooldowns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::metrics::MetricsSnapshot;

/// How loud an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Needs attention now.
    Critical,
}

/// One rule. The condition reads a snapshot and says whether to fire.
pub struct AlertRule {
    /// Unique rule name.
    pub name: String,
    /// Severity of the resulting alert.
    pub severity: AlertSeverity,
    /// Message attached to firings.
    pub message: String,
    /// Minimum milliseconds between firings of this rule.
    pub cooldown_ms: i64,
    /// The predicate.
    pub condition: Box<dyn Fn(&MetricsSnapshot) -> bool + Send + Sync>,
}

/// A firing recorded in the active-alerts map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveAlert {
    /// Rule name.
    pub name: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Message.
    pub message: String,
    /// ISO-8601 of the most recent firing.
    pub fired_at: String,
}

/// Evaluates rules against snapshots. Cooldowns and the active map are
/// process-lifetime state. A fresh engine per tick loses cooldowns and
/// storms; build one at boot and keep it.
pub struct AlertEngine {
    rules: Vec<AlertRule>,
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
    active: Mutex<HashMap<String, ActiveAlert>>,
}

impl AlertEngine {
    /// Engine over a fixed rule set.
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self {
            rules,
            last_fired: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate every rule. Returns the alerts that fired this pass:
    /// condition true and cooldown elapsed.
    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> Vec<ActiveAlert> {
        let now = Utc::now();
        let mut fired = Vec::new();
        let mut last_fired = self.last_fired.lock().expect("alert lock");
        let mut active = self.active.lock().expect("alert lock");

        for rule in &self.rules {
            if !(rule.condition)(snapshot) {
                continue;
            }
            if let Some(last) = last_fired.get(&rule.name) {
                let elapsed_ms = (now - *last).num_milliseconds();
                if elapsed_ms < rule.cooldown_ms {
                    continue;
                }
            }

            let alert = ActiveAlert {
                name: rule.name.clone(),
                severity: rule.severity,
                message: rule.message.clone(),
                fired_at: automaton_core::id::to_iso(now),
            };
            last_fired.insert(rule.name.clone(), now);
            active.insert(rule.name.clone(), alert.clone());
            fired.push(alert);
        }

        fired
    }

    /// The most recent firing per rule, deduplicated.
    pub fn active_alerts(&self) -> Vec<ActiveAlert> {
        let active = self.active.lock().expect("alert lock");
        let mut alerts: Vec<ActiveAlert> = active.values().cloned().collect();
        alerts.sort_by(|a, b| a.name.cmp(&b.name));
        alerts
    }

    /// Drop an alert from the active map and reset its cooldown so the
    /// next condition hit fires immediately.
    pub fn clear_alert(&self, name: &str) {
        self.active.lock().expect("alert lock").remove(name);
        self.last_fired.lock().expect("alert lock").remove(name);
    }
}
