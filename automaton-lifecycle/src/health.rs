//! Health probing of live children, fan-out bounded by a semaphore.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use tokio::sync::Semaphore;

use automaton_core::{ChildState, Result, SandboxClient};

use crate::manager::LifecycleManager;

/// The command run inside a child's sandbox to ask how it feels.
pub const PROBE_COMMAND: &str = "automaton status --json";

/// Default cap on concurrent probes.
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 3;

/// Outcome of probing one child.
#[derive(Debug, Clone)]
pub struct ChildHealth {
    /// The child probed.
    pub child_id: String,
    /// Whether the probe reported `healthy`.
    pub healthy: bool,
    /// Probe output or failure description.
    pub detail: String,
}

#[derive(Debug, Deserialize)]
struct ProbeResponse {
    status: String,
    #[serde(default)]
    #[allow(dead_code)]
    uptime: Option<u64>,
}

/// Probes every live child and records the resulting transitions.
pub struct HealthMonitor {
    manager: Arc<LifecycleManager>,
    sandbox: Arc<dyn SandboxClient>,
    probe_timeout: Duration,
    max_concurrent: usize,
}

impl HealthMonitor {
    /// Monitor with the default concurrency cap of 3.
    pub fn new(manager: Arc<LifecycleManager>, sandbox: Arc<dyn SandboxClient>) -> Self {
        Self {
            manager,
            sandbox,
            probe_timeout: Duration::from_secs(10),
            max_concurrent: DEFAULT_MAX_CONCURRENT_CHECKS,
        }
    }

    /// Override the concurrency cap.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Probe every child in a probeable state (`starting`, `healthy`,
    /// `unhealthy`), at most `max_concurrent` at a time, and apply the
    /// resulting transitions.
    pub async fn check_all(&self) -> Result<Vec<ChildHealth>> {
        let children = self.manager.store().list_children()?;
        let targets: Vec<_> = children
            .into_iter()
            .filter(|c| {
                matches!(
                    c.status,
                    ChildState::Starting | ChildState::Healthy | ChildState::Unhealthy
                )
            })
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let probes = targets.into_iter().map(|child| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let health = self.probe(&child.id, &child.sandbox_id).await;
                (child, health)
            }
        });

        let mut results = Vec::new();
        for (child, health) in join_all(probes).await {
            let now = automaton_core::id::now_iso();
            self.manager.store().set_child_last_checked(&child.id, &now)?;
            self.apply_transition(&child.id, child.status, &health)?;
            results.push(health);
        }
        Ok(results)
    }

    async fn probe(&self, child_id: &str, sandbox_id: &str) -> ChildHealth {
        let exec = tokio::time::timeout(
            self.probe_timeout,
            self.sandbox
                .exec_in(sandbox_id, PROBE_COMMAND, Some(self.probe_timeout.as_millis() as u64)),
        )
        .await;

        match exec {
            Err(_) => ChildHealth {
                child_id: child_id.to_string(),
                healthy: false,
                detail: "probe timed out".into(),
            },
            Ok(Err(e)) => ChildHealth {
                child_id: child_id.to_string(),
                healthy: false,
                detail: format!("probe failed: {e}"),
            },
            Ok(Ok(result)) => match serde_json::from_str::<ProbeResponse>(&result.stdout) {
                Ok(response) => ChildHealth {
                    child_id: child_id.to_string(),
                    healthy: response.status == "healthy",
                    detail: result.stdout.trim().to_string(),
                },
                Err(e) => ChildHealth {
                    child_id: child_id.to_string(),
                    healthy: false,
                    detail: format!("unparseable probe output: {e}"),
                },
            },
        }
    }

    fn apply_transition(
        &self,
        child_id: &str,
        from: ChildState,
        health: &ChildHealth,
    ) -> Result<()> {
        let to = match (from, health.healthy) {
            (ChildState::Starting, true) => Some(ChildState::Healthy),
            (ChildState::Starting, false) => None, // still booting
            (ChildState::Healthy, false) => Some(ChildState::Unhealthy),
            (ChildState::Unhealthy, true) => Some(ChildState::Healthy),
            _ => None,
        };
        if let Some(to) = to {
            self.manager.transition(
                child_id,
                to,
                "health probe",
                serde_json::json!({"detail": health.detail}),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisSpec;
    use async_trait::async_trait;
    use automaton_core::clients::{
        ExecResult, SandboxInfo, TransferReceipt,
    };
    use automaton_state::StateStore;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSandbox {
        responses: Mutex<HashMap<String, String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeSandbox {
        fn new(responses: &[(&str, &str)]) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SandboxClient for FakeSandbox {
        async fn exec(&self, _: &str, _: Option<u64>) -> Result<ExecResult> {
            unimplemented!("not probed in these tests")
        }

        async fn exec_in(
            &self,
            sandbox_id: &str,
            _command: &str,
            _timeout_ms: Option<u64>,
        ) -> Result<ExecResult> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let stdout = self
                .responses
                .lock()
                .unwrap()
                .get(sandbox_id)
                .cloned()
                .unwrap_or_else(|| r#"{"status":"unreachable"}"#.into());
            Ok(ExecResult {
                exit_code: 0,
                stdout,
                stderr: String::new(),
            })
        }

        async fn read_file(&self, _: &str) -> Result<String> {
            unimplemented!()
        }
        async fn write_file(&self, _: &str, _: &str) -> Result<()> {
            unimplemented!()
        }
        async fn expose_port(&self, _: u16) -> Result<String> {
            unimplemented!()
        }
        async fn create_sandbox(&self, _: &str) -> Result<SandboxInfo> {
            unimplemented!()
        }
        async fn delete_sandbox(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn list_sandboxes(&self) -> Result<Vec<SandboxInfo>> {
            Ok(vec![])
        }
        async fn credits_balance(&self) -> Result<i64> {
            Ok(1000)
        }
        async fn transfer_credits(
            &self,
            _: &str,
            _: i64,
            _: Option<&str>,
        ) -> Result<TransferReceipt> {
            unimplemented!()
        }
        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn healthy_child(manager: &LifecycleManager, id: &str, sandbox: &str) {
        manager
            .init_child(
                id,
                &GenesisSpec {
                    name: format!("c-{id}"),
                    specialization: "t".into(),
                    task: "t".into(),
                    message: None,
                    initial_credits_cents: 0,
                },
            )
            .unwrap();
        manager.store().set_child_sandbox(id, sandbox).unwrap();
        for to in [
            ChildState::SandboxCreated,
            ChildState::RuntimeReady,
            ChildState::WalletVerified,
            ChildState::Funded,
            ChildState::Starting,
            ChildState::Healthy,
        ] {
            manager
                .transition(id, to, "", serde_json::Value::Null)
                .unwrap();
        }
    }

    #[tokio::test]
    async fn unhealthy_probe_demotes_healthy_child() {
        let manager = Arc::new(LifecycleManager::new(Arc::new(
            StateStore::open_in_memory().unwrap(),
        )));
        healthy_child(&manager, "C1", "sbx-1");
        healthy_child(&manager, "C2", "sbx-2");

        let sandbox = Arc::new(FakeSandbox::new(&[
            ("sbx-1", r#"{"status":"healthy","uptime":120}"#),
            ("sbx-2", r#"{"status":"degraded"}"#),
        ]));
        let monitor = HealthMonitor::new(manager.clone(), sandbox);

        let results = monitor.check_all().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(manager.current_state("C1").unwrap(), ChildState::Healthy);
        assert_eq!(manager.current_state("C2").unwrap(), ChildState::Unhealthy);
        assert!(
            manager
                .store()
                .get_child("C2")
                .unwrap()
                .unwrap()
                .last_checked
                .is_some()
        );
    }

    #[tokio::test]
    async fn recovery_promotes_unhealthy_child() {
        let manager = Arc::new(LifecycleManager::new(Arc::new(
            StateStore::open_in_memory().unwrap(),
        )));
        healthy_child(&manager, "C1", "sbx-1");
        manager
            .transition("C1", ChildState::Unhealthy, "probe", serde_json::Value::Null)
            .unwrap();

        let sandbox = Arc::new(FakeSandbox::new(&[(
            "sbx-1",
            r#"{"status":"healthy","uptime":5}"#,
        )]));
        let monitor = HealthMonitor::new(manager.clone(), sandbox);
        monitor.check_all().await.unwrap();
        assert_eq!(manager.current_state("C1").unwrap(), ChildState::Healthy);
    }

    #[tokio::test]
    async fn fan_out_respects_the_semaphore() {
        let manager = Arc::new(LifecycleManager::new(Arc::new(
            StateStore::open_in_memory().unwrap(),
        )));
        for i in 0..8 {
            healthy_child(&manager, &format!("C{i}"), &format!("sbx-{i}"));
        }

        let sandbox = Arc::new(FakeSandbox::new(&[]));
        let monitor = HealthMonitor::new(manager.clone(), sandbox.clone()).with_max_concurrent(3);
        monitor.check_all().await.unwrap();
        assert!(
            sandbox.peak.load(Ordering::SeqCst) <= 3,
            "peak concurrency {} exceeded the cap",
            sandbox.peak.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn garbage_probe_output_counts_as_unhealthy() {
        let manager = Arc::new(LifecycleManager::new(Arc::new(
            StateStore::open_in_memory().unwrap(),
        )));
        healthy_child(&manager, "C1", "sbx-1");

        let sandbox = Arc::new(FakeSandbox::new(&[("sbx-1", "segfault")]));
        let monitor = HealthMonitor::new(manager.clone(), sandbox);
        let results = monitor.check_all().await.unwrap();
        assert!(!results[0].healthy);
        assert_eq!(manager.current_state("C1").unwrap(), ChildState::Unhealthy);
    }
}
