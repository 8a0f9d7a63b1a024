use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("System '{0}' is not registered")]
    NotRegistered(String),

    /// No start-up order exists because these systems form or sit behind a cycle.
    #[error("Dependency cycle prevents ordering: {}", .remaining.join(", "))]
    CycleDetected { remaining: Vec<String> },
}
