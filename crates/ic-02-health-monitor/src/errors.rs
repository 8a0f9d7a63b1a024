//! Error types for the health monitor.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    #[error("System '{0}' is not registered")]
    NotRegistered(String),

    /// The probe reached the system and it reported a failure.
    #[error("Health probe failed: {0}")]
    ProbeFailed(String),

    #[error("Health check timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}
