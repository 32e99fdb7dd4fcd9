//! The state machine: init, transition, history.

use std::sync::Arc;

use automaton_core::{Child, ChildLifecycleEvent, ChildState, Error, Result, new_id};
use automaton_state::StateStore;

use crate::genesis::GenesisSpec;

/// Owns all lifecycle mutations. Everything goes through
/// [`LifecycleManager::transition`], so the event log and the status
/// column can never disagree.
pub struct LifecycleManager {
    store: Arc<StateStore>,
}

impl LifecycleManager {
    /// Manager over the shared store.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Create a child in `requested` with its genesis event.
    pub fn init_child(&self, id: &str, spec: &GenesisSpec) -> Result<Child> {
        spec.validate()?;
        let child = Child {
            id: id.to_string(),
            name: spec.name.clone(),
            address: String::new(),
            sandbox_id: String::new(),
            genesis_prompt: spec.genesis_prompt(),
            funded_amount_cents: 0,
            status: ChildState::Requested,
            created_at: automaton_core::id::now_iso(),
            last_checked: None,
        };
        self.store.insert_child(&child, "spawn requested")?;
        Ok(child)
    }

    /// Move a child to `to`, rejecting any edge not in the transition
    /// table. Appends the event and updates the status atomically.
    pub fn transition(
        &self,
        child_id: &str,
        to: ChildState,
        reason: &str,
        metadata: serde_json::Value,
    ) -> Result<()> {
        let child = self
            .store
            .get_child(child_id)?
            .ok_or_else(|| Error::not_found("child", child_id))?;

        if !child.status.can_transition_to(to) {
            return Err(Error::InvalidInput(format!(
                "Invalid lifecycle transition: {} → {}",
                child.status, to
            )));
        }

        self.store.record_child_transition(&ChildLifecycleEvent {
            id: new_id(),
            child_id: child_id.to_string(),
            from_state: child.status.to_string(),
            to_state: to,
            reason: reason.to_string(),
            metadata,
            created_at: automaton_core::id::now_iso(),
        })?;

        tracing::debug!(child = child_id, from = %child.status, to = %to, "lifecycle transition");
        Ok(())
    }

    /// The child's current state.
    pub fn current_state(&self, child_id: &str) -> Result<ChildState> {
        Ok(self
            .store
            .get_child(child_id)?
            .ok_or_else(|| Error::not_found("child", child_id))?
            .status)
    }

    /// The child's full event log, oldest first.
    pub fn history(&self, child_id: &str) -> Result<Vec<ChildLifecycleEvent>> {
        Ok(self.store.lifecycle_events(child_id)?)
    }

    /// The shared store, for collaborators that read children directly.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}
