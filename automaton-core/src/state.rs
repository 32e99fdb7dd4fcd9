//! Agent runtime states and survival tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime states the agent moves through across its life.
///
/// Persisted as the `state` column on every turn row, and in the kv
/// table under `agent_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// First boot, identity not yet written.
    Setup,
    /// Just started or returning from sleep.
    Waking,
    /// Active reasoning loop.
    Running,
    /// Idle until the next wake event or `sleep_until`.
    Sleeping,
    /// Credits low: downgraded model, stretched heartbeat.
    LowCompute,
    /// Near zero: essential tasks only.
    Critical,
    /// No resources remaining. Halted.
    Dead,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Setup => "setup",
            Self::Waking => "waking",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::LowCompute => "low_compute",
            Self::Critical => "critical",
            Self::Dead => "dead",
        };
        f.write_str(s)
    }
}

impl AgentState {
    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "setup" => Some(Self::Setup),
            "waking" => Some(Self::Waking),
            "running" => Some(Self::Running),
            "sleeping" => Some(Self::Sleeping),
            "low_compute" => Some(Self::LowCompute),
            "critical" => Some(Self::Critical),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }
}

/// Discrete classification of the credit balance, used to gate heartbeat
/// tasks and pick models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalTier {
    /// $0.00 or below.
    Dead,
    /// Above $0.00, at most $0.10.
    Critical,
    /// Above $0.10, at most $0.50.
    LowCompute,
    /// Above $0.50, at most $5.00.
    Normal,
    /// Above $5.00.
    High,
}

impl SurvivalTier {
    /// Classify a credit balance in integer cents.
    pub fn from_cents(cents: i64) -> Self {
        if cents > 500 {
            Self::High
        } else if cents > 50 {
            Self::Normal
        } else if cents > 10 {
            Self::LowCompute
        } else if cents > 0 {
            Self::Critical
        } else {
            Self::Dead
        }
    }

    /// Parse the snake_case form used in schedule rows.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dead" => Some(Self::Dead),
            "critical" => Some(Self::Critical),
            "low_compute" => Some(Self::LowCompute),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// The agent state this tier maps to while awake.
    pub fn agent_state(self) -> AgentState {
        match self {
            Self::High | Self::Normal => AgentState::Running,
            Self::LowCompute => AgentState::LowCompute,
            Self::Critical => AgentState::Critical,
            Self::Dead => AgentState::Dead,
        }
    }
}

impl fmt::Display for SurvivalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dead => "dead",
            Self::Critical => "critical",
            Self::LowCompute => "low_compute",
            Self::Normal => "normal",
            Self::High => "high",
        };
        f.write_str(s)
    }
}
