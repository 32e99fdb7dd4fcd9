//! Sandbox cleanup and dead-child pruning.

use std::sync::Arc;

use chrono::{Duration, Utc};

use automaton_core::{ChildState, Error, Result, SandboxClient};

use crate::manager::LifecycleManager;

/// What a cleanup pass accomplished.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Children whose sandboxes were deleted and who reached `cleaned_up`.
    pub cleaned: Vec<String>,
    /// Children removed entirely by pruning.
    pub pruned: Vec<String>,
}

impl LifecycleManager {
    /// Delete a child's sandbox and move it to `cleaned_up`. Only legal
    /// from `stopped` or `failed`.
    pub async fn cleanup(
        &self,
        sandbox_client: &Arc<dyn SandboxClient>,
        child_id: &str,
    ) -> Result<()> {
        let child = self
            .store()
            .get_child(child_id)?
            .ok_or_else(|| Error::not_found("child", child_id))?;

        if !child.status.is_cleanable() {
            return Err(Error::InvalidInput(format!(
                "cannot clean up child {child_id} in state {}",
                child.status
            )));
        }

        if !child.sandbox_id.is_empty() {
            sandbox_client.delete_sandbox(&child.sandbox_id).await?;
        }
        self.transition(
            child_id,
            ChildState::CleanedUp,
            "sandbox deleted",
            serde_json::Value::Null,
        )
    }

    /// Clean up every cleanable child whose last probe is older than
    /// `hours`. Children that were never probed are treated as stale.
    pub async fn cleanup_stale(
        &self,
        sandbox_client: &Arc<dyn SandboxClient>,
        hours: i64,
    ) -> Result<CleanupReport> {
        let cutoff = automaton_core::id::to_iso(Utc::now() - Duration::hours(hours));
        let mut report = CleanupReport::default();

        for child in self.store().list_children()? {
            if !child.status.is_cleanable() {
                continue;
            }
            let stale = child
                .last_checked
                .as_deref()
                .map(|at| at < cutoff.as_str())
                .unwrap_or(true);
            if !stale {
                continue;
            }
            match self.cleanup(sandbox_client, &child.id).await {
                Ok(()) => report.cleaned.push(child.id),
                Err(e) => {
                    tracing::warn!(child = %child.id, error = %e, "stale cleanup failed");
                }
            }
        }
        Ok(report)
    }

    /// Prune dead children (stopped, failed, cleaned_up) beyond the
    /// `keep_last` most recent, oldest first. Children still holding a
    /// sandbox get a cleanup first.
    pub async fn prune_dead_children(
        &self,
        sandbox_client: &Arc<dyn SandboxClient>,
        keep_last: usize,
    ) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        // list_children is ordered by created_at ascending.
        let dead: Vec<_> = self
            .store()
            .list_children()?
            .into_iter()
            .filter(|c| c.status.is_dead())
            .collect();

        if dead.len() <= keep_last {
            return Ok(report);
        }

        let excess = dead.len() - keep_last;
        for child in dead.into_iter().take(excess) {
            if child.status.is_cleanable() {
                match self.cleanup(sandbox_client, &child.id).await {
                    Ok(()) => report.cleaned.push(child.id.clone()),
                    Err(e) => {
                        tracing::warn!(child = %child.id, error = %e, "pre-prune cleanup failed");
                    }
                }
            }
            self.store().delete_child(&child.id)?;
            report.pruned.push(child.id);
        }

        Ok(report)
    }
}
