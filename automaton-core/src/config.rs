//! Runtime configuration, threaded through the context at boot.
//!
//! No global mutable config: runtime mutations (`switch_model`) update
//! the in-memory value and the persisted file together.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::state::SurvivalTier;

/// Spend caps, all in integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreasuryPolicy {
    /// Hourly cap on direct transfers.
    pub max_hourly_transfer_cents: i64,
    /// Daily cap on direct transfers.
    pub max_daily_transfer_cents: i64,
    /// Cap on a single x402 payment; hourly/daily caps derive from it.
    pub max_x402_payment_cents: i64,
    /// Daily cap applied to inference and uncategorised spend.
    pub max_inference_daily_cents: i64,
    /// Financial tool calls allowed in one turn.
    pub max_transfers_per_turn: u32,
    /// Days spend records are kept before pruning.
    pub retention_days: i64,
}

impl Default for TreasuryPolicy {
    fn default() -> Self {
        Self {
            max_hourly_transfer_cents: 10_000,
            max_daily_transfer_cents: 50_000,
            max_x402_payment_cents: 100,
            max_inference_daily_cents: 2_000,
            max_transfers_per_turn: 3,
            retention_days: 30,
        }
    }
}

impl TreasuryPolicy {
    /// Hourly cap for a spend category.
    pub fn hourly_cap_cents(&self, category: crate::spend::SpendCategory) -> i64 {
        use crate::spend::SpendCategory::*;
        match category {
            Transfer => self.max_hourly_transfer_cents,
            X402 => self.max_x402_payment_cents * 10,
            // Inference and other have no hourly cap of their own; the
            // daily cap is the binding one.
            Inference | Other => self.max_inference_daily_cents,
        }
    }

    /// Daily cap for a spend category.
    pub fn daily_cap_cents(&self, category: crate::spend::SpendCategory) -> i64 {
        use crate::spend::SpendCategory::*;
        match category {
            Transfer => self.max_daily_transfer_cents,
            X402 => self.max_x402_payment_cents * 50,
            Inference | Other => self.max_inference_daily_cents,
        }
    }
}

/// Per-tier model routing and budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelStrategy {
    /// Fallbacks tried in order after the tier's primary model fails.
    pub fallback_models: Vec<String>,
    /// Output-token budget per turn at `normal` and above.
    pub normal_max_tokens: u32,
    /// Output-token budget per turn at `low_compute`.
    pub low_compute_max_tokens: u32,
    /// Output-token budget per turn at `critical`.
    pub critical_max_tokens: u32,
}

impl Default for ModelStrategy {
    fn default() -> Self {
        Self {
            fallback_models: vec![],
            normal_max_tokens: 4096,
            low_compute_max_tokens: 2048,
            critical_max_tokens: 1024,
        }
    }
}

impl ModelStrategy {
    /// Output-token budget for a tier.
    pub fn max_tokens_for(&self, tier: SurvivalTier) -> u32 {
        match tier {
            SurvivalTier::High | SurvivalTier::Normal => self.normal_max_tokens,
            SurvivalTier::LowCompute => self.low_compute_max_tokens,
            SurvivalTier::Critical | SurvivalTier::Dead => self.critical_max_tokens,
        }
    }
}

/// Soul-model behaviour knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoulConfig {
    /// Minimum alignment score before self-modification needs approval.
    pub alignment_threshold: f64,
    /// Whether self-modification requires creator approval.
    pub require_approval: bool,
    /// Whether the periodic reflection task runs.
    pub reflection_enabled: bool,
}

impl Default for SoulConfig {
    fn default() -> Self {
        Self {
            alignment_threshold: 0.7,
            require_approval: true,
            reflection_enabled: true,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutomatonConfig {
    /// Agent name used in prompts and ping payloads.
    pub name: String,
    /// Immutable-ish mission statement inserted into the system prompt.
    pub genesis_prompt: String,
    /// Address recognised as owner for audit.
    pub creator_address: String,
    /// Model at `normal` tier and above.
    pub inference_model: String,
    /// Model at `low_compute` tier.
    pub low_compute_model: String,
    /// Model at `critical` tier.
    pub critical_model: String,
    /// Hard cap on output tokens per turn.
    pub max_tokens_per_turn: u32,
    /// Heartbeat schedule overrides file.
    pub heartbeat_config_path: String,
    /// State database path.
    pub db_path: String,
    /// Skills directory.
    pub skills_dir: String,
    /// Social relay base URL. Must be HTTPS.
    pub social_relay_url: String,
    /// Spend caps.
    pub treasury_policy: TreasuryPolicy,
    /// Routing matrix and per-tier budgets.
    pub model_strategy: ModelStrategy,
    /// Soul behaviour.
    pub soul_config: SoulConfig,
    /// Hard cap on living children.
    pub max_children: u32,
    /// Interval stretch factor applied at `low_compute` tier.
    pub low_compute_multiplier: u32,
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            name: "automaton".into(),
            genesis_prompt: String::new(),
            creator_address: String::new(),
            inference_model: "claude-sonnet-4-5".into(),
            low_compute_model: "claude-haiku-4-5".into(),
            critical_model: "claude-haiku-4-5".into(),
            max_tokens_per_turn: 4096,
            heartbeat_config_path: "heartbeat.yml".into(),
            db_path: "state.db".into(),
            skills_dir: "skills".into(),
            social_relay_url: "https://relay.conway.sh".into(),
            treasury_policy: TreasuryPolicy::default(),
            model_strategy: ModelStrategy::default(),
            soul_config: SoulConfig::default(),
            max_children: 3,
            low_compute_multiplier: 4,
        }
    }
}

impl AutomatonConfig {
    /// Reject configurations that must never reach the runtime.
    pub fn validate(&self) -> Result<()> {
        if !self.social_relay_url.starts_with("https://") {
            return Err(Error::InvalidInput(format!(
                "socialRelayUrl must be HTTPS: {}",
                self.social_relay_url
            )));
        }
        if self.max_children == 0 {
            return Err(Error::InvalidInput("maxChildren must be at least 1".into()));
        }
        Ok(())
    }

    /// Model for a survival tier.
    pub fn model_for(&self, tier: SurvivalTier) -> &str {
        match tier {
            SurvivalTier::High | SurvivalTier::Normal => &self.inference_model,
            SurvivalTier::LowCompute => &self.low_compute_model,
            SurvivalTier::Critical | SurvivalTier::Dead => &self.critical_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spend::SpendCategory;

    #[test]
    fn default_treasury_matches_contract() {
        let policy = TreasuryPolicy::default();
        assert_eq!(policy.max_hourly_transfer_cents, 10_000);
        assert_eq!(policy.hourly_cap_cents(SpendCategory::X402), 1_000);
        assert_eq!(policy.daily_cap_cents(SpendCategory::X402), 5_000);
        assert_eq!(
            policy.daily_cap_cents(SpendCategory::Inference),
            policy.max_inference_daily_cents
        );
    }

    #[test]
    fn http_relay_rejected() {
        let config = AutomatonConfig {
            social_relay_url: "http://relay.conway.sh".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = AutomatonConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tier_routing_picks_cheaper_models_downward() {
        let config = AutomatonConfig::default();
        assert_eq!(config.model_for(SurvivalTier::High), "claude-sonnet-4-5");
        assert_eq!(config.model_for(SurvivalTier::Critical), "claude-haiku-4-5");
    }

    #[test]
    fn config_accepts_camel_case_keys() {
        let json = r#"{
            "name": "probe",
            "genesisPrompt": "build things",
            "socialRelayUrl": "https://relay.example.com",
            "treasuryPolicy": { "maxHourlyTransferCents": 500 },
            "maxChildren": 2
        }"#;
        let config: AutomatonConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.name, "probe");
        assert_eq!(config.treasury_policy.max_hourly_transfer_cents, 500);
        assert_eq!(config.max_children, 2);
    }
}
