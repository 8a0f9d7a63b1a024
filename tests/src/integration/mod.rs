//! Cross-component scenarios.

pub mod alerting;
pub mod balancing;
pub mod event_flow;
pub mod topology;

#[cfg(test)]
pub(crate) mod support {
    use std::sync::Arc;
    use std::time::Duration;

    use coordinator_runtime::{CoordinatorConfig, IntegrationCoordinator};
    use ic_02_health_monitor::{HealthProbe, MockProbe};
    use shared_bus::InMemoryTransport;

    pub struct Harness {
        pub coordinator: Arc<IntegrationCoordinator>,
        pub transport: Arc<InMemoryTransport>,
        pub probe: Arc<MockProbe>,
    }

    /// A coordinator over an in-memory transport and a scripted probe.
    pub async fn harness(config: CoordinatorConfig) -> Harness {
        let transport = Arc::new(InMemoryTransport::new());
        let probe = Arc::new(MockProbe::new());
        let coordinator = IntegrationCoordinator::new(
            config,
            transport.clone(),
            Some(probe.clone() as Arc<dyn HealthProbe>),
        )
        .await
        .expect("coordinator");
        Harness {
            coordinator,
            transport,
            probe,
        }
    }

    /// Config with fast retries and a long health interval.
    pub fn fast_config() -> CoordinatorConfig {
        let mut config = CoordinatorConfig::default();
        config.bus.retry_delay_ms = 1;
        config.health.check_interval_secs = 3600;
        config.health.check_timeout_ms = 50;
        config
    }

    pub async fn wait_until(cond: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached");
    }
}
