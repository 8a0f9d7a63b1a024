//! Health state machine.
//!
//! Pure: no clocks and no I/O. The monitor feeds it signals and records
//! the result.

use shared_types::HealthStatus;

/// Input that may change a system's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthSignal {
    /// A check (polled or reported) succeeded.
    CheckPassed,
    /// A check failed or timed out.
    CheckFailed,
    /// A runtime error or error-rate breach was reported for the system.
    ErrorObserved,
}

/// Status after applying `signal` to `current`.
///
/// Check outcomes always win. Error signals degrade HEALTHY and UNHEALTHY
/// systems; UNKNOWN systems ignore them until their first check.
pub fn next_status(current: HealthStatus, signal: HealthSignal) -> HealthStatus {
    match (current, signal) {
        (_, HealthSignal::CheckPassed) => HealthStatus::Healthy,
        (_, HealthSignal::CheckFailed) => HealthStatus::Unhealthy,
        (HealthStatus::Unknown, HealthSignal::ErrorObserved) => HealthStatus::Unknown,
        (_, HealthSignal::ErrorObserved) => HealthStatus::Degraded,
    }
}
