//! # Health Monitor Service
//!
//! Runs checks through the `HealthProbe` port, applies the state machine,
//! and announces every status transition on the bus.

use crate::domain::state::{next_status, HealthSignal};
use crate::errors::HealthError;
use crate::ports::outbound::{HealthProbe, SweepObserver};
use chrono::Utc;
use futures::future::join_all;
use ic_01_service_registry::{HealthLookup, ServiceRegistry};
use ic_03_load_balancer::InstancePool;
use integration_telemetry::{
    component_span, log_system_event, time_histogram, HEALTH_CHECKS, HEALTH_CHECK_DURATION,
};
use parking_lot::RwLock;
use shared_bus::{CrossSystemEvent, EventPublisher, CORE_SOURCE};
use shared_types::{EventKind, HealthRecord, HealthStatus, Priority};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, Instrument};

const COMPONENT: &str = "health-monitor";

#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Time between sweeps.
    pub check_interval: Duration,
    /// Upper bound for one probe call.
    pub check_timeout: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            check_timeout: Duration::from_secs(5),
        }
    }
}

struct Transition {
    system: String,
    from: HealthStatus,
    to: HealthStatus,
}

pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    probe: Arc<dyn HealthProbe>,
    publisher: Arc<dyn EventPublisher>,
    pool: Option<Arc<InstancePool>>,
    records: RwLock<HashMap<String, HealthRecord>>,
    config: HealthMonitorConfig,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        probe: Arc<dyn HealthProbe>,
        publisher: Arc<dyn EventPublisher>,
        config: HealthMonitorConfig,
    ) -> Self {
        Self {
            registry,
            probe,
            publisher,
            pool: None,
            records: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Also probe the instances in `pool` on every sweep.
    pub fn with_pool(mut self, pool: Arc<InstancePool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    /// Start tracking a system with an UNKNOWN record. Existing records are kept.
    pub fn track(&self, system: &str) {
        self.records
            .write()
            .entry(system.to_string())
            .or_insert_with(|| HealthRecord::unknown(system));
    }

    /// Stop tracking a system.
    pub fn untrack(&self, system: &str) -> Option<HealthRecord> {
        self.records.write().remove(system)
    }

    /// Current record, if the system is tracked.
    pub fn record(&self, system: &str) -> Option<HealthRecord> {
        self.records.read().get(system).cloned()
    }

    /// Check one registered system now.
    ///
    /// Probe failures and timeouts are recorded as UNHEALTHY, not returned.
    pub async fn perform_health_check(&self, system: &str) -> Result<HealthRecord, HealthError> {
        let descriptor = self
            .registry
            .get(system)
            .ok_or_else(|| HealthError::NotRegistered(system.to_string()))?;
        self.track(system);

        let started = Instant::now();
        let outcome = {
            let _timer = time_histogram!(HEALTH_CHECK_DURATION);
            match timeout(self.config.check_timeout, self.probe.check(&descriptor)).await {
                Ok(result) => result,
                Err(_) => Err(HealthError::Timeout {
                    after_ms: self.config.check_timeout.as_millis() as u64,
                }),
            }
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        let (signal, last_error, label) = match &outcome {
            Ok(()) => (HealthSignal::CheckPassed, None, "healthy"),
            Err(HealthError::Timeout { .. }) => {
                (HealthSignal::CheckFailed, Some("timeout".to_string()), "timeout")
            }
            Err(e) => (HealthSignal::CheckFailed, Some(e.to_string()), "unhealthy"),
        };
        HEALTH_CHECKS.with_label_values(&[label]).inc();

        let dependency_statuses = if signal == HealthSignal::CheckPassed {
            let records = self.records.read();
            Some(
                descriptor
                    .dependencies
                    .iter()
                    .map(|dep| {
                        let status = records.get(dep).map(|r| r.status).unwrap_or_default();
                        (dep.clone(), status)
                    })
                    .collect::<BTreeMap<_, _>>(),
            )
        } else {
            None
        };

        let (record, transition) = {
            let mut records = self.records.write();
            let record = records
                .entry(system.to_string())
                .or_insert_with(|| HealthRecord::unknown(system));
            let from = record.status;
            record.status = next_status(from, signal);
            record.last_check = Some(Utc::now());
            record.response_time_ms = response_time_ms;
            record.last_error = last_error;
            if let Some(statuses) = dependency_statuses {
                record.dependency_statuses = statuses;
            }
            let transition = (from != record.status).then(|| Transition {
                system: system.to_string(),
                from,
                to: record.status,
            });
            (record.clone(), transition)
        };

        log_system_event!(
            debug,
            COMPONENT,
            "Health check finished",
            system,
            status = %record.status,
            response_time_ms
        );
        if let Some(transition) = transition {
            self.announce(transition);
        }
        Ok(record)
    }

    /// Apply a signal reported by a system rather than polled.
    ///
    /// Returns `None` if the system is not registered.
    pub fn apply_signal(
        &self,
        system: &str,
        signal: HealthSignal,
        reason: Option<String>,
    ) -> Option<HealthRecord> {
        if !self.registry.contains(system) {
            return None;
        }
        let (record, transition) = {
            let mut records = self.records.write();
            let record = records
                .entry(system.to_string())
                .or_insert_with(|| HealthRecord::unknown(system));
            let from = record.status;
            record.status = next_status(from, signal);
            match signal {
                HealthSignal::CheckPassed => {
                    record.last_check = Some(Utc::now());
                    record.last_error = None;
                }
                HealthSignal::CheckFailed => {
                    record.last_check = Some(Utc::now());
                    record.last_error = reason.or_else(|| Some("reported failure".to_string()));
                }
                HealthSignal::ErrorObserved => {
                    if from != HealthStatus::Unknown {
                        record.last_error = reason;
                    }
                }
            }
            let transition = (from != record.status).then(|| Transition {
                system: system.to_string(),
                from,
                to: record.status,
            });
            (record.clone(), transition)
        };
        if let Some(transition) = transition {
            self.announce(transition);
        }
        Some(record)
    }

    /// Check every registered system concurrently, then probe instances.
    pub async fn sweep(&self) -> BTreeMap<String, HealthRecord> {
        let names: Vec<String> = self
            .registry
            .list()
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect();
        let span = component_span!("health_sweep", systems = names.len());

        async {
            let results = join_all(names.iter().map(|name| self.perform_health_check(name))).await;
            for (name, result) in names.iter().zip(results) {
                if let Err(e) = result {
                    debug!(system = %name, error = %e, "Skipped during sweep");
                }
            }
            self.probe_instances().await;
        }
        .instrument(span)
        .await;

        self.health_snapshot()
    }

    async fn probe_instances(&self) {
        let Some(pool) = &self.pool else {
            return;
        };
        let instances = pool.all_instances();
        let probes = instances.iter().map(|instance| async move {
            timeout(self.config.check_timeout, self.probe.probe_instance(instance))
                .await
                .unwrap_or(false)
        });
        let results = join_all(probes).await;

        for (instance, healthy) in instances.iter().zip(results) {
            let previous =
                pool.set_healthy(&instance.service_name, &instance.host, instance.port, healthy);
            if previous.is_some_and(|was| was != healthy) {
                info!(
                    service = %instance.service_name,
                    address = %instance.address(),
                    healthy,
                    "Instance health changed"
                );
            }
        }
    }

    /// Sweep every `check_interval` until `shutdown` turns true.
    ///
    /// The first sweep runs immediately. `observer` runs after each sweep.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        observer: Option<Arc<dyn SweepObserver>>,
    ) {
        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.config.check_interval.as_secs(), "Health monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snapshot = self.sweep().await;
                    if let Some(observer) = &observer {
                        observer.on_sweep_complete(&snapshot);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Health monitor stopped");
    }

    /// A record for every registered system; UNKNOWN if never checked.
    pub fn health_snapshot(&self) -> BTreeMap<String, HealthRecord> {
        let records = self.records.read();
        self.registry
            .list()
            .into_iter()
            .map(|descriptor| {
                let record = records
                    .get(&descriptor.name)
                    .cloned()
                    .unwrap_or_else(|| HealthRecord::unknown(&descriptor.name));
                (descriptor.name, record)
            })
            .collect()
    }

    fn announce(&self, transition: Transition) {
        let priority = if transition.to == HealthStatus::Unhealthy {
            Priority::Critical
        } else {
            Priority::High
        };
        log_system_event!(
            info,
            COMPONENT,
            "Health status changed",
            transition.system,
            from = %transition.from,
            to = %transition.to
        );
        let event = CrossSystemEvent::builder(CORE_SOURCE, EventKind::HealthChanged)
            .priority(priority)
            .payload(serde_json::json!({
                "system": &transition.system,
                "from": transition.from,
                "to": transition.to,
            }))
            .build();
        if let Err(e) = self.publisher.publish(event) {
            debug!(system = %transition.system, error = %e, "Health change not published");
        }
    }
}

impl HealthLookup for HealthMonitor {
    fn status_of(&self, system: &str) -> HealthStatus {
        self.records
            .read()
            .get(system)
            .map(|record| record.status)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::mocks::{MockProbe, ProbeBehavior};
    use ic_03_load_balancer::LoadBalancer;
    use parking_lot::Mutex;
    use shared_bus::RecordingPublisher;
    use shared_types::{ServiceDescriptor, ServiceInstance};

    struct Fixture {
        registry: Arc<ServiceRegistry>,
        probe: Arc<MockProbe>,
        publisher: Arc<RecordingPublisher>,
        monitor: Arc<HealthMonitor>,
    }

    fn fixture_with(pool: Option<Arc<InstancePool>>) -> Fixture {
        let publisher = Arc::new(RecordingPublisher::new());
        let registry = Arc::new(ServiceRegistry::new(publisher.clone()));
        let probe = Arc::new(MockProbe::new());
        let config = HealthMonitorConfig {
            check_interval: Duration::from_millis(10),
            check_timeout: Duration::from_millis(30),
        };
        let mut monitor = HealthMonitor::new(registry.clone(), probe.clone(), publisher.clone(), config);
        if let Some(pool) = pool {
            monitor = monitor.with_pool(pool);
        }
        Fixture {
            registry,
            probe,
            publisher,
            monitor: Arc::new(monitor),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(None)
    }

    fn health_changes(publisher: &RecordingPublisher) -> Vec<serde_json::Value> {
        publisher
            .of_kind(&EventKind::HealthChanged)
            .into_iter()
            .map(|event| event.payload)
            .collect()
    }

    #[tokio::test]
    async fn test_unregistered_check_is_error() {
        let f = fixture();
        assert_eq!(
            f.monitor.perform_health_check("ghost").await,
            Err(HealthError::NotRegistered("ghost".into()))
        );
    }

    #[tokio::test]
    async fn test_passing_check_transitions_and_announces() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("orders"));
        f.monitor.track("orders");
        assert_eq!(f.monitor.status_of("orders"), HealthStatus::Unknown);

        let record = f.monitor.perform_health_check("orders").await.unwrap();
        assert_eq!(record.status, HealthStatus::Healthy);
        assert!(record.last_check.is_some());
        assert!(record.last_error.is_none());

        let changes = health_changes(&f.publisher);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["from"], "UNKNOWN");
        assert_eq!(changes[0]["to"], "HEALTHY");

        // Same outcome again: no transition, no event
        f.monitor.perform_health_check("orders").await.unwrap();
        assert_eq!(health_changes(&f.publisher).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_critical_change() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("orders"));
        f.probe.set("orders", ProbeBehavior::Failing("db down".into()));

        let record = f.monitor.perform_health_check("orders").await.unwrap();
        assert_eq!(record.status, HealthStatus::Unhealthy);
        assert_eq!(record.last_error.as_deref(), Some("Health probe failed: db down"));
        let events = f.publisher.of_kind(&EventKind::HealthChanged);
        assert_eq!(events[0].priority, Priority::Critical);
    }

    #[tokio::test]
    async fn test_timeout_is_unhealthy() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("slow"));
        f.probe.set("slow", ProbeBehavior::Hang);

        let record = f.monitor.perform_health_check("slow").await.unwrap();
        assert_eq!(record.status, HealthStatus::Unhealthy);
        assert_eq!(record.last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_dependency_statuses_copied_on_success() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("a").depends_on("b").depends_on("c"));
        f.registry.register(ServiceDescriptor::new("b"));
        f.monitor.perform_health_check("b").await.unwrap();

        let record = f.monitor.perform_health_check("a").await.unwrap();
        assert_eq!(record.dependency_statuses.get("b"), Some(&HealthStatus::Healthy));
        assert_eq!(record.dependency_statuses.get("c"), Some(&HealthStatus::Unknown));
    }

    #[tokio::test]
    async fn test_error_signal_degrades_then_check_recovers() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("orders"));

        // UNKNOWN ignores error signals
        let record = f
            .monitor
            .apply_signal("orders", HealthSignal::ErrorObserved, Some("boom".into()))
            .unwrap();
        assert_eq!(record.status, HealthStatus::Unknown);

        f.monitor.perform_health_check("orders").await.unwrap();
        let record = f
            .monitor
            .apply_signal("orders", HealthSignal::ErrorObserved, Some("boom".into()))
            .unwrap();
        assert_eq!(record.status, HealthStatus::Degraded);
        assert_eq!(record.last_error.as_deref(), Some("boom"));

        let record = f.monitor.perform_health_check("orders").await.unwrap();
        assert_eq!(record.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_apply_signal_unregistered() {
        let f = fixture();
        assert!(f
            .monitor
            .apply_signal("ghost", HealthSignal::CheckPassed, None)
            .is_none());
    }

    #[tokio::test]
    async fn test_snapshot_covers_registered_systems() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("a"));
        f.registry.register(ServiceDescriptor::new("b"));
        f.monitor.perform_health_check("a").await.unwrap();

        let snapshot = f.monitor.health_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["a"].status, HealthStatus::Healthy);
        assert_eq!(snapshot["b"].status, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_sweep_checks_all_and_probes_instances() {
        let pool = Arc::new(InstancePool::new(Arc::new(LoadBalancer::default())));
        pool.register_instance(ServiceInstance::new("a", "10.0.0.1", 80));
        pool.register_instance(ServiceInstance::new("a", "10.0.0.2", 80));
        let f = fixture_with(Some(pool.clone()));
        f.registry.register(ServiceDescriptor::new("a"));
        f.registry.register(ServiceDescriptor::new("b"));
        f.probe.set("b", ProbeBehavior::Failing("x".into()));
        f.probe.set_instance_down("10.0.0.2:80", true);

        let snapshot = f.monitor.sweep().await;
        assert_eq!(snapshot["a"].status, HealthStatus::Healthy);
        assert_eq!(snapshot["b"].status, HealthStatus::Unhealthy);
        assert_eq!(f.probe.check_count(), 2);

        let flags: Vec<bool> = pool.instances("a").iter().map(|i| i.healthy).collect();
        assert_eq!(flags, vec![true, false]);
    }

    struct CountingObserver(Mutex<usize>);

    impl SweepObserver for CountingObserver {
        fn on_sweep_complete(&self, _snapshot: &BTreeMap<String, HealthRecord>) {
            *self.0.lock() += 1;
        }
    }

    #[tokio::test]
    async fn test_run_sweeps_until_shutdown() {
        let f = fixture();
        f.registry.register(ServiceDescriptor::new("a"));
        let observer = Arc::new(CountingObserver(Mutex::new(0)));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(Arc::clone(&f.monitor).run(rx, Some(observer.clone())));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();

        assert!(*observer.0.lock() >= 1);
        assert_eq!(f.monitor.status_of("a"), HealthStatus::Healthy);
    }
}
