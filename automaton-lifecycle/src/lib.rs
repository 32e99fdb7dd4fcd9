#![deny(missing_docs)]
//! # automaton-lifecycle — children from spawn to cleanup
//!
//! A child is born `requested`, walks the provisioning chain
//! (`sandbox_created → runtime_ready → wallet_verified → funded →
//! starting → healthy`), oscillates between `healthy` and `unhealthy`
//! under the health monitor, and ends its life `stopped` or `failed`
//! before `cleaned_up` removes its sandbox. Every move is validated
//! against the transition table in `automaton-core` and appended to the
//! event log.

mod cleanup;
mod genesis;
mod health;
mod manager;

pub use cleanup::CleanupReport;
pub use genesis::GenesisSpec;
pub use health::{ChildHealth, HealthMonitor, PROBE_COMMAND};
pub use manager::LifecycleManager;
