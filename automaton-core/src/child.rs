//! Child lifecycle states and the legal transition table.
//!
//! A child is a replica of the agent spawned into its own sandbox. Its
//! life is an eleven-state graph; every move is recorded as an
//! append-only [`ChildLifecycleEvent`] whose `to_state` values strictly
//! follow [`ChildState::valid_next`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The eleven lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildState {
    /// Spawn accepted, nothing provisioned yet.
    Requested,
    /// Sandbox exists.
    SandboxCreated,
    /// Runtime installed and ready inside the sandbox.
    RuntimeReady,
    /// The child reported its wallet address and it checked out.
    WalletVerified,
    /// Seed credits transferred.
    Funded,
    /// Boot command issued.
    Starting,
    /// Health probe passing.
    Healthy,
    /// Health probe failing; recovery possible.
    Unhealthy,
    /// Deliberately stopped.
    Stopped,
    /// Provisioning or runtime failure.
    Failed,
    /// Sandbox deleted. Terminal.
    CleanedUp,
}

impl ChildState {
    /// States a child may legally move to from `self`.
    ///
    /// `CleanedUp` has no outgoing edges.
    pub fn valid_next(self) -> &'static [ChildState] {
        use ChildState::*;
        match self {
            Requested => &[SandboxCreated, Failed],
            SandboxCreated => &[RuntimeReady, Failed],
            RuntimeReady => &[WalletVerified, Failed],
            WalletVerified => &[Funded, Failed],
            Funded => &[Starting, Failed],
            Starting => &[Healthy, Failed],
            Healthy => &[Unhealthy, Stopped],
            Unhealthy => &[Healthy, Stopped, Failed],
            Stopped => &[CleanedUp],
            Failed => &[CleanedUp],
            CleanedUp => &[],
        }
    }

    /// Whether a transition from `self` to `to` is on the graph.
    pub fn can_transition_to(self, to: ChildState) -> bool {
        self.valid_next().contains(&to)
    }

    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CleanedUp)
    }

    /// States eligible for cleanup (sandbox deletion).
    pub fn is_cleanable(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// States counted as dead when pruning.
    pub fn is_dead(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed | Self::CleanedUp)
    }

    /// Parse the snake_case form used in the store.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(Self::Requested),
            "sandbox_created" => Some(Self::SandboxCreated),
            "runtime_ready" => Some(Self::RuntimeReady),
            "wallet_verified" => Some(Self::WalletVerified),
            "funded" => Some(Self::Funded),
            "starting" => Some(Self::Starting),
            "healthy" => Some(Self::Healthy),
            "unhealthy" => Some(Self::Unhealthy),
            "stopped" => Some(Self::Stopped),
            "failed" => Some(Self::Failed),
            "cleaned_up" => Some(Self::CleanedUp),
            _ => None,
        }
    }
}

impl fmt::Display for ChildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::SandboxCreated => "sandbox_created",
            Self::RuntimeReady => "runtime_ready",
            Self::WalletVerified => "wallet_verified",
            Self::Funded => "funded",
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::CleanedUp => "cleaned_up",
        };
        f.write_str(s)
    }
}

/// A tracked child agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    /// ULID.
    pub id: String,
    /// Validated genesis name.
    pub name: String,
    /// Wallet address. Empty until `wallet_verified`.
    pub address: String,
    /// Sandbox the child runs in.
    pub sandbox_id: String,
    /// The mission statement it was born with.
    pub genesis_prompt: String,
    /// Seed credits transferred at funding, in cents.
    pub funded_amount_cents: i64,
    /// Latest `to_state` from the event log.
    pub status: ChildState,
    /// ISO-8601 creation time.
    pub created_at: String,
    /// ISO-8601 time of the last health probe, if any.
    pub last_checked: Option<String>,
}

/// One append-only record of a lifecycle transition.
///
/// The first event for any child has `from_state = "none"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildLifecycleEvent {
    /// ULID.
    pub id: String,
    /// The child this event belongs to.
    pub child_id: String,
    /// Previous state, or `"none"` for the initial event.
    pub from_state: String,
    /// New state.
    pub to_state: ChildState,
    /// Why the transition happened.
    pub reason: String,
    /// Free-form context (probe output, funding amount...).
    pub metadata: serde_json::Value,
    /// ISO-8601 insertion time.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        use ChildState::*;
        let path = [
            Requested,
            SandboxCreated,
            RuntimeReady,
            WalletVerified,
            Funded,
            Starting,
            Healthy,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn cleaned_up_has_no_outgoing_edges() {
        assert!(ChildState::CleanedUp.valid_next().is_empty());
        assert!(ChildState::CleanedUp.is_terminal());
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!ChildState::Requested.can_transition_to(ChildState::Healthy));
        assert!(!ChildState::SandboxCreated.can_transition_to(ChildState::Funded));
        assert!(!ChildState::Healthy.can_transition_to(ChildState::Requested));
    }

    #[test]
    fn unhealthy_can_recover_or_die() {
        assert!(ChildState::Unhealthy.can_transition_to(ChildState::Healthy));
        assert!(ChildState::Unhealthy.can_transition_to(ChildState::Stopped));
        assert!(ChildState::Unhealthy.can_transition_to(ChildState::Failed));
    }

    #[test]
    fn only_stopped_and_failed_are_cleanable() {
        for state in [
            ChildState::Requested,
            ChildState::SandboxCreated,
            ChildState::RuntimeReady,
            ChildState::WalletVerified,
            ChildState::Funded,
            ChildState::Starting,
            ChildState::Healthy,
            ChildState::Unhealthy,
            ChildState::CleanedUp,
        ] {
            assert!(!state.is_cleanable(), "{state} should not be cleanable");
        }
        assert!(ChildState::Stopped.is_cleanable());
        assert!(ChildState::Failed.is_cleanable());
    }

    #[test]
    fn parse_round_trip() {
        use ChildState::*;
        for state in [
            Requested,
            SandboxCreated,
            RuntimeReady,
            WalletVerified,
            Funded,
            Starting,
            Healthy,
            Unhealthy,
            Stopped,
            Failed,
            CleanedUp,
        ] {
            assert_eq!(ChildState::parse(&state.to_string()), Some(state));
        }
    }
}
