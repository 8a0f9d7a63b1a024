//! # Wiring
//!
//! Connects components through the bus and the sweep observer.
//!
//! ```text
//! HealthOk / HealthFailed / SystemError / Alert ──▶ HealthSignalHandler ──▶ Monitor
//! Monitor sweep ──▶ AlertSweepObserver ──▶ Alert Engine ──▶ Alert event
//! ```

pub mod alert_sweep;

pub use alert_sweep::AlertSweepObserver;

use ic_02_health_monitor::{HealthMonitor, HealthSignalHandler};
use shared_bus::{EventBus, EventHandler, SubscriptionId};
use shared_types::EventKind;
use std::sync::Arc;

/// Kinds that feed the health state machine.
pub const HEALTH_SIGNAL_KINDS: [EventKind; 4] = [
    EventKind::HealthOk,
    EventKind::HealthFailed,
    EventKind::SystemError,
    EventKind::Alert,
];

/// Subscribe one `HealthSignalHandler` to every health signal kind.
pub fn subscribe_health_signals(bus: &EventBus, monitor: &Arc<HealthMonitor>) -> Vec<SubscriptionId> {
    let handler: Arc<dyn EventHandler> = Arc::new(HealthSignalHandler::new(Arc::downgrade(monitor)));
    HEALTH_SIGNAL_KINDS
        .into_iter()
        .map(|kind| bus.subscribe(kind, Arc::clone(&handler)))
        .collect()
}
