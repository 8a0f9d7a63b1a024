//! Bus handler turning health and error events into health signals.

use crate::domain::state::HealthSignal;
use crate::service::HealthMonitor;
use async_trait::async_trait;
use shared_bus::{CrossSystemEvent, EventHandler, HandlerError};
use shared_types::{AlertType, EventKind};
use std::sync::Weak;
use tracing::debug;

/// Applies `HealthOk`, `HealthFailed`, `SystemError` and high-error-rate
/// `Alert` events to the monitor.
///
/// The affected system is `payload.system` when present, otherwise the
/// event source. Events about unregistered systems are ignored.
pub struct HealthSignalHandler {
    monitor: Weak<HealthMonitor>,
}

impl HealthSignalHandler {
    pub fn new(monitor: Weak<HealthMonitor>) -> Self {
        Self { monitor }
    }

    fn signal_for(event: &CrossSystemEvent) -> Option<(String, HealthSignal, Option<String>)> {
        let field = |name: &str| {
            event
                .payload
                .get(name)
                .and_then(|value| value.as_str())
                .map(str::to_string)
        };
        let system = || field("system").unwrap_or_else(|| event.source.clone());

        match &event.kind {
            EventKind::HealthOk => Some((system(), HealthSignal::CheckPassed, None)),
            EventKind::HealthFailed => Some((system(), HealthSignal::CheckFailed, field("reason"))),
            EventKind::SystemError => Some((
                system(),
                HealthSignal::ErrorObserved,
                field("error").or_else(|| field("reason")),
            )),
            EventKind::Alert => {
                let high_error_rate = AlertType::HighErrorRate.to_string();
                if field("alert_type").as_deref() != Some(high_error_rate.as_str()) {
                    return None;
                }
                let system = field("system_name")?;
                Some((system, HealthSignal::ErrorObserved, field("message")))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl EventHandler for HealthSignalHandler {
    async fn handle(&self, event: &CrossSystemEvent) -> Result<(), HandlerError> {
        let Some(monitor) = self.monitor.upgrade() else {
            return Ok(());
        };
        let Some((system, signal, reason)) = Self::signal_for(event) else {
            return Ok(());
        };
        if monitor.apply_signal(&system, signal, reason).is_none() {
            debug!(system = %system, kind = %event.kind, "Health signal for unregistered system");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "health-signal"
    }
}
