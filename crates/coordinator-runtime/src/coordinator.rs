//! # Integration Coordinator
//!
//! The single entry point other systems use. Built once and shared by `Arc`.
//!
//! ## Shutdown Sequence
//!
//! 1. Stop the health loop
//! 2. Stop the bus loop (drain or drop, logged)
//! 3. Close the transport

use std::collections::BTreeMap;
use std::sync::Arc;

use ic_01_service_registry::{
    DependencyValidator, RegistrationReceipt, RegistryError, ServiceRegistry, ValidationReport,
};
use ic_02_health_monitor::{HealthError, HealthMonitor, HealthProbe, SweepObserver};
use ic_03_load_balancer::{InstancePool, SelectionError, Strategy};
use ic_04_alert_engine::{AlertEngine, AlertError, AlertHandler};
use parking_lot::Mutex;
use shared_bus::{
    BusError, CrossSystemEvent, EventBus, EventHandler, EventPublisher, ShutdownMode,
    SubscriptionId, Transport,
};
use shared_types::{
    Alert, EventId, EventKind, HealthRecord, IntegrationMetrics, ServiceDescriptor,
    ServiceInstance,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::container::{Components, CoordinatorConfig};
use crate::error::CoordinatorError;
use crate::wiring::{subscribe_health_signals, AlertSweepObserver};

/// Metrics for one system or for all of them.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsView {
    /// `None` if the system has no recorded traffic.
    Single(Option<IntegrationMetrics>),
    All(BTreeMap<String, IntegrationMetrics>),
}

pub struct IntegrationCoordinator {
    config: CoordinatorConfig,
    transport: Arc<dyn Transport>,
    bus: Arc<EventBus>,
    registry: Arc<ServiceRegistry>,
    validator: DependencyValidator,
    pool: Arc<InstancePool>,
    monitor: Arc<HealthMonitor>,
    alerts: Arc<AlertEngine>,
    sweep_observer: Arc<AlertSweepObserver>,
    shutdown_tx: watch::Sender<bool>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

impl IntegrationCoordinator {
    /// Build every component and register the configured systems.
    ///
    /// Nothing runs until [`start`](Self::start). `probe` defaults to TCP
    /// connects against pooled instances.
    pub async fn new(
        config: CoordinatorConfig,
        transport: Arc<dyn Transport>,
        probe: Option<Arc<dyn HealthProbe>>,
    ) -> Result<Arc<Self>, CoordinatorError> {
        let Components {
            transport,
            bus,
            registry,
            pool,
            monitor,
            validator,
            alerts,
        } = Components::build(&config, transport, probe).await?;

        subscribe_health_signals(&bus, &monitor);
        let sweep_observer = Arc::new(AlertSweepObserver::new(
            Arc::clone(&alerts),
            Arc::clone(&bus),
            Arc::clone(&registry),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        let coordinator = Arc::new(Self {
            config,
            transport,
            bus,
            registry,
            validator,
            pool,
            monitor,
            alerts,
            sweep_observer,
            shutdown_tx,
            health_task: Mutex::new(None),
        });

        for system in &coordinator.config.systems {
            coordinator.register_system(system.descriptor());
            match system.instances() {
                Ok(instances) => {
                    for instance in instances {
                        coordinator.register_instance(instance);
                    }
                }
                Err(e) => warn!(system = %system.name, error = %e, "Configured instances skipped"),
            }
        }

        Ok(coordinator)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn pool(&self) -> &Arc<InstancePool> {
        &self.pool
    }

    pub fn alerts(&self) -> &Arc<AlertEngine> {
        &self.alerts
    }

    /// Start the bus loop and the periodic health loop. Idempotent.
    pub fn start(&self) {
        let mut task = self.health_task.lock();
        if task.is_some() {
            debug!("Coordinator already started");
            return;
        }
        self.bus.start();
        let observer: Arc<dyn SweepObserver> = self.sweep_observer.clone();
        *task = Some(tokio::spawn(
            Arc::clone(&self.monitor).run(self.shutdown_tx.subscribe(), Some(observer)),
        ));
        info!(systems = self.registry.len(), "Integration coordinator started");
    }

    /// Stop the health loop, then the bus, then close the transport.
    pub async fn shutdown(&self, mode: ShutdownMode) {
        info!(mode = ?mode, "Initiating coordinator shutdown...");

        self.shutdown_tx.send_replace(true);
        let task = self.health_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "Health loop terminated abnormally");
            }
        }

        self.bus.shutdown(mode).await;

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "Transport close failed");
        }
        info!("Coordinator shutdown complete");
    }

    // -------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------

    /// Register or replace a system and start tracking its health.
    pub fn register_system(&self, descriptor: ServiceDescriptor) -> RegistrationReceipt {
        let name = descriptor.name.clone();
        let receipt = self.registry.register(descriptor);
        self.monitor.track(&name);
        receipt
    }

    /// Remove a system with its health record and pooled instances.
    ///
    /// A later re-registration starts again from UNKNOWN.
    pub fn deregister_system(&self, system: &str) -> Result<ServiceDescriptor, RegistryError> {
        let descriptor = self.registry.deregister(system)?;
        self.monitor.untrack(system);
        let instances = self.pool.deregister_service(system);
        debug!(system, instances = instances.len(), "System state dropped");
        Ok(descriptor)
    }

    pub fn validate_integration(&self, system: &str) -> ValidationReport {
        self.validator.validate(system)
    }

    pub fn validate_all(&self) -> Vec<ValidationReport> {
        self.validator.validate_all()
    }

    // -------------------------------------------------------------------------
    // Event bus
    // -------------------------------------------------------------------------

    pub fn publish_event(&self, event: CrossSystemEvent) -> Result<EventId, BusError> {
        self.bus.publish(event)
    }

    pub fn subscribe_to_event(&self, kind: impl Into<EventKind>, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.bus.subscribe(kind.into(), handler)
    }

    pub fn subscribe_to_all(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.bus.subscribe_all(handler)
    }

    pub fn get_event_correlation(&self, correlation_id: &str) -> Vec<EventId> {
        self.bus.event_correlation(correlation_id)
    }

    /// Metrics for `system`, or every system when `None`.
    pub fn get_system_metrics(&self, system: Option<&str>) -> MetricsView {
        match system {
            Some(name) => MetricsView::Single(self.bus.metrics(name)),
            None => MetricsView::All(self.get_all_metrics()),
        }
    }

    pub fn get_all_metrics(&self) -> BTreeMap<String, IntegrationMetrics> {
        self.bus.all_metrics()
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    pub fn get_system_health(&self) -> BTreeMap<String, HealthRecord> {
        self.monitor.health_snapshot()
    }

    pub async fn perform_health_check(&self, system: &str) -> Result<HealthRecord, HealthError> {
        self.monitor.perform_health_check(system).await
    }

    /// One full sweep followed by the alert scan. Returns the raised alerts.
    pub async fn run_sweep(&self) -> Vec<Alert> {
        let snapshot = self.monitor.sweep().await;
        self.sweep_observer.scan(&snapshot)
    }

    // -------------------------------------------------------------------------
    // Load balancing
    // -------------------------------------------------------------------------

    pub fn set_load_balancing_strategy(&self, name: &str) -> Result<Strategy, SelectionError> {
        self.pool.balancer().set_strategy(name)
    }

    /// Choose one of `instances`; `None` if no instance qualifies.
    pub fn select_instance(&self, service: &str, instances: &[ServiceInstance]) -> Option<ServiceInstance> {
        match self.pool.balancer().select(service, instances) {
            Ok(instance) => Some(instance),
            Err(e) => {
                debug!(service, error = %e, "No instance selected");
                None
            }
        }
    }

    pub fn register_instance(&self, instance: ServiceInstance) -> bool {
        self.pool.register_instance(instance)
    }

    pub fn deregister_instance(&self, service: &str, host: &str, port: u16) -> Option<ServiceInstance> {
        self.pool.deregister_instance(service, host, port)
    }

    pub fn select_from_pool(&self, service: &str) -> Result<ServiceInstance, SelectionError> {
        self.pool.select_from_pool(service)
    }

    // -------------------------------------------------------------------------
    // Alerts
    // -------------------------------------------------------------------------

    pub fn subscribe_to_alerts(&self, handler: Arc<dyn AlertHandler>) {
        self.alerts.subscribe_to_alerts(handler);
    }

    pub fn get_active_alerts(&self) -> Vec<Alert> {
        self.alerts.active_alerts()
    }

    pub fn resolve_alert(&self, id: Uuid) -> Result<Alert, AlertError> {
        self.alerts.resolve_alert(id)
    }
}
