//! Runs the alert scan after every health sweep.

use ic_01_service_registry::ServiceRegistry;
use ic_02_health_monitor::SweepObserver;
use ic_04_alert_engine::AlertEngine;
use shared_bus::EventBus;
use shared_types::{Alert, HealthRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct AlertSweepObserver {
    alerts: Arc<AlertEngine>,
    bus: Arc<EventBus>,
    registry: Arc<ServiceRegistry>,
}

impl AlertSweepObserver {
    pub fn new(alerts: Arc<AlertEngine>, bus: Arc<EventBus>, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            alerts,
            bus,
            registry,
        }
    }

    /// Scan a health snapshot against current bus metrics and dependencies.
    pub fn scan(&self, snapshot: &BTreeMap<String, HealthRecord>) -> Vec<Alert> {
        let raised = self.alerts.sweep(
            snapshot,
            &self.bus.all_metrics(),
            &self.registry.dependency_map(),
        );
        debug!(systems = snapshot.len(), raised = raised.len(), "Alert scan finished");
        raised
    }
}

impl SweepObserver for AlertSweepObserver {
    fn on_sweep_complete(&self, snapshot: &BTreeMap<String, HealthRecord>) {
        self.scan(snapshot);
    }
}
