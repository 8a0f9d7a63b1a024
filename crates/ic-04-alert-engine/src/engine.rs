//! # Alert Engine
//!
//! Raises, stores and resolves alerts. Every raised alert is published as an
//! `Alert` event and handed to the alert subscribers.

use crate::config::AlertConfig;
use crate::error::AlertError;
use crate::subscriber::AlertHandler;
use chrono::Utc;
use integration_telemetry::{log_system_event, ALERTS_RAISED, ALERTS_RESOLVED};
use parking_lot::RwLock;
use shared_bus::{CrossSystemEvent, EventPublisher, CORE_SOURCE};
use shared_types::{
    Alert, AlertType, EventKind, HealthRecord, HealthStatus, IntegrationMetrics, Severity,
};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

const COMPONENT: &str = "alert-engine";

struct Candidate {
    alert_type: AlertType,
    severity: Severity,
    system: String,
    dependency: Option<String>,
    message: String,
}

pub struct AlertEngine {
    publisher: Arc<dyn EventPublisher>,
    config: AlertConfig,
    /// Every alert ever raised, in raise order.
    alerts: RwLock<Vec<Alert>>,
    handlers: RwLock<Vec<Arc<dyn AlertHandler>>>,
}

impl AlertEngine {
    pub fn new(publisher: Arc<dyn EventPublisher>, config: AlertConfig) -> Self {
        Self {
            publisher,
            config,
            alerts: RwLock::new(Vec::new()),
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn subscribe_to_alerts(&self, handler: Arc<dyn AlertHandler>) {
        debug!(handler = handler.name(), "Alert subscriber added");
        self.handlers.write().push(handler);
    }

    /// Scan one sweep's results and return the alerts raised by it.
    ///
    /// Only systems present in `health` are scanned, in name order. Metrics
    /// recorded for any other source are ignored. `dependencies` maps each
    /// system to its declared dependency names.
    pub fn sweep(
        &self,
        health: &BTreeMap<String, HealthRecord>,
        metrics: &BTreeMap<String, IntegrationMetrics>,
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Vec<Alert> {
        let mut candidates = Vec::new();

        for (system, record) in health {
            if record.status == HealthStatus::Unhealthy {
                candidates.push(Candidate {
                    alert_type: AlertType::SystemDown,
                    severity: Severity::Critical,
                    system: system.clone(),
                    dependency: None,
                    message: format!("System {system} is unhealthy"),
                });
            }

            if let Some(m) = metrics.get(system) {
                if m.error_rate > self.config.error_rate_threshold {
                    candidates.push(Candidate {
                        alert_type: AlertType::HighErrorRate,
                        severity: Severity::High,
                        system: system.clone(),
                        dependency: None,
                        message: format!(
                            "System {system} error rate {} exceeds threshold {}",
                            m.error_rate, self.config.error_rate_threshold
                        ),
                    });
                }
            }

            for dependency in dependencies.get(system.as_str()).into_iter().flatten() {
                if health.get(dependency).map(|r| r.status) == Some(HealthStatus::Unhealthy) {
                    candidates.push(Candidate {
                        alert_type: AlertType::DependencyFailure,
                        severity: Severity::High,
                        system: system.clone(),
                        dependency: Some(dependency.clone()),
                        message: format!("Dependency {dependency} of {system} is unhealthy"),
                    });
                }
            }
        }

        candidates
            .into_iter()
            .filter_map(|candidate| self.raise(candidate))
            .collect()
    }

    fn raise(&self, candidate: Candidate) -> Option<Alert> {
        let alert = {
            let mut alerts = self.alerts.write();
            let duplicate = self.config.dedupe_open_alerts
                && alerts.iter().any(|open| {
                    !open.resolved
                        && open.same_condition(
                            candidate.alert_type,
                            &candidate.system,
                            candidate.dependency.as_deref(),
                        )
                });
            if duplicate {
                return None;
            }
            let mut alert = Alert::new(
                candidate.alert_type,
                candidate.severity,
                candidate.system,
                candidate.message,
            );
            alert.dependency = candidate.dependency;
            alerts.push(alert.clone());
            alert
        };

        let alert_type = alert.alert_type.to_string();
        ALERTS_RAISED.with_label_values(&[alert_type.as_str()]).inc();
        log_system_event!(
            warn,
            COMPONENT,
            "Alert raised",
            alert.system_name,
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            message = %alert.message
        );

        self.publish(EventKind::Alert, &alert);
        self.notify(&alert);
        Some(alert)
    }

    fn publish(&self, kind: EventKind, alert: &Alert) {
        let payload = match serde_json::to_value(alert) {
            Ok(payload) => payload,
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Alert not serializable");
                return;
            }
        };
        let event = CrossSystemEvent::builder(CORE_SOURCE, kind)
            .priority(alert.severity.priority())
            .payload(payload)
            .build();
        if let Err(e) = self.publisher.publish(event) {
            warn!(alert_id = %alert.id, error = %e, "Alert event not published");
        }
    }

    fn notify(&self, alert: &Alert) {
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler.on_alert(alert))).is_err() {
                error!(handler = handler.name(), alert_id = %alert.id, "Alert handler panicked");
            }
        }
    }

    /// Mark an alert resolved and publish `AlertResolved`.
    ///
    /// Resolving an already-resolved alert does nothing.
    pub fn resolve_alert(&self, id: Uuid) -> Result<Alert, AlertError> {
        let resolved = {
            let mut alerts = self.alerts.write();
            let alert = alerts
                .iter_mut()
                .find(|alert| alert.id == id)
                .ok_or(AlertError::AlertNotFound(id))?;
            if alert.resolved {
                return Ok(alert.clone());
            }
            alert.resolved = true;
            alert.resolved_at = Some(Utc::now());
            alert.clone()
        };

        ALERTS_RESOLVED.inc();
        log_system_event!(
            info,
            COMPONENT,
            "Alert resolved",
            resolved.system_name,
            alert_id = %resolved.id,
            alert_type = %resolved.alert_type
        );
        self.publish(EventKind::AlertResolved, &resolved);
        Ok(resolved)
    }

    /// Unresolved alerts, oldest first.
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts
            .read()
            .iter()
            .filter(|alert| !alert.resolved)
            .cloned()
            .collect()
    }

    /// All alerts, oldest first.
    pub fn alert_history(&self) -> Vec<Alert> {
        self.alerts.read().clone()
    }
}
