//! Driven Ports (SPI - Outbound Dependencies)

use crate::errors::HealthError;
use async_trait::async_trait;
use shared_types::{HealthRecord, ServiceDescriptor, ServiceInstance};
use std::collections::BTreeMap;

/// Reaches a system to find out whether it is alive.
///
/// Calls are bounded by the monitor's `check_timeout`; a probe that never
/// returns is recorded as a timeout.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Check a registered system.
    async fn check(&self, descriptor: &ServiceDescriptor) -> Result<(), HealthError>;

    /// Check one instance of a system. Defaults to reachable.
    async fn probe_instance(&self, instance: &ServiceInstance) -> bool {
        let _ = instance;
        true
    }
}

/// Notified after every completed sweep.
pub trait SweepObserver: Send + Sync {
    fn on_sweep_complete(&self, snapshot: &BTreeMap<String, HealthRecord>);
}

/// Scripted probe for tests, here and in downstream crates through the
/// `test-utils` feature.
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted behaviour of [`MockProbe`] for one system.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ProbeBehavior {
        Healthy,
        Failing(String),
        /// Never answers; the check times out.
        Hang,
    }

    /// Probe whose answers are set per system.
    ///
    /// Systems without a script are healthy. Instances listed as down fail
    /// their instance probe.
    #[derive(Debug, Default)]
    pub struct MockProbe {
        behaviors: RwLock<HashMap<String, ProbeBehavior>>,
        down_instances: RwLock<HashSet<String>>,
        checks: AtomicUsize,
    }

    impl MockProbe {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, system: &str, behavior: ProbeBehavior) {
            self.behaviors.write().insert(system.to_string(), behavior);
        }

        /// Mark an instance (by `host:port`) as unreachable or reachable.
        pub fn set_instance_down(&self, address: &str, down: bool) {
            let mut down_instances = self.down_instances.write();
            if down {
                down_instances.insert(address.to_string());
            } else {
                down_instances.remove(address);
            }
        }

        /// Number of system checks performed.
        pub fn check_count(&self) -> usize {
            self.checks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthProbe for MockProbe {
        async fn check(&self, descriptor: &ServiceDescriptor) -> Result<(), HealthError> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            let behavior = self
                .behaviors
                .read()
                .get(&descriptor.name)
                .cloned()
                .unwrap_or(ProbeBehavior::Healthy);
            match behavior {
                ProbeBehavior::Healthy => Ok(()),
                ProbeBehavior::Failing(reason) => Err(HealthError::ProbeFailed(reason)),
                ProbeBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }

        async fn probe_instance(&self, instance: &ServiceInstance) -> bool {
            !self.down_instances.read().contains(&instance.address())
        }
    }
}
