//! Outbound Ports (Driven Ports / SPI)

use shared_types::HealthStatus;

/// Read access to current health status.
///
/// Implemented by the health monitor; the validator only needs the status
/// of each dependency at the moment of validation.
pub trait HealthLookup: Send + Sync {
    /// Current status of `system`; `Unknown` if it was never checked.
    fn status_of(&self, system: &str) -> HealthStatus;
}

/// Mock implementations for testing
#[cfg(test)]
pub mod mocks {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    /// Lookup backed by a fixed table.
    #[derive(Default)]
    pub struct StaticHealthLookup {
        statuses: RwLock<HashMap<String, HealthStatus>>,
    }

    impl StaticHealthLookup {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, system: &str, status: HealthStatus) {
            self.statuses.write().insert(system.to_string(), status);
        }
    }

    impl HealthLookup for StaticHealthLookup {
        fn status_of(&self, system: &str) -> HealthStatus {
            self.statuses
                .read()
                .get(system)
                .copied()
                .unwrap_or_default()
        }
    }
}
