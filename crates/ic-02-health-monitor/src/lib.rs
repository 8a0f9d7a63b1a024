//! # IC-02: Health Monitor
//!
//! Tracks one `HealthRecord` per registered system and moves it through a
//! small state machine driven by explicit signals.
//!
//! ## State Machine
//!
//! ```text
//!              check ok                 check failed
//!   UNKNOWN ─────────────▶ HEALTHY ◀──────────────▶ UNHEALTHY
//!      │                    │   ▲                     │   ▲
//!      │ check failed       │   │ next check          │   │ next check
//!      └──────────────▶     ▼   │                     ▼   │
//!                        DEGRADED ◀───── error signal ─────┘
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: `HealthSignal`, `next_status`
//! - **Ports**: Outbound (`HealthProbe`, `SweepObserver`)
//! - **Service**: `HealthMonitor` (checks, sweeps, interval loop)
//! - **Adapters**: `HealthSignalHandler`, a bus handler applying health and
//!   error events published by systems

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

pub use adapters::bus_handler::HealthSignalHandler;
pub use domain::state::{next_status, HealthSignal};
pub use errors::HealthError;
pub use ports::outbound::{HealthProbe, SweepObserver};

#[cfg(any(test, feature = "test-utils"))]
pub use ports::outbound::mocks::{MockProbe, ProbeBehavior};
pub use service::{HealthMonitor, HealthMonitorConfig};
