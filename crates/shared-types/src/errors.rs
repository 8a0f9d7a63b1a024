//! # Error Types
//!
//! Defines topology problems reported by dependency validation. They are
//! report entries, not failures: validation always returns a report.

use crate::entities::{EventKind, HealthStatus};
use thiserror::Error;

/// A problem found in the declared topology of a system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyIssue {
    /// The validated system itself is not registered.
    #[error("System '{0}' is not registered")]
    UnknownSystem(String),

    /// A declared dependency is not registered.
    #[error("Dependency '{dependency}' of '{system}' is not registered")]
    MissingDependency { system: String, dependency: String },

    /// A declared dependency is registered but not HEALTHY.
    #[error("Dependency '{dependency}' of '{system}' is {status}")]
    UnhealthyDependency {
        system: String,
        dependency: String,
        status: HealthStatus,
    },

    /// A subscribed kind has no registered publisher.
    #[error("No registered system publishes '{kind}' subscribed by '{system}'")]
    MissingPublisher { system: String, kind: EventKind },

    /// The dependency graph contains a cycle.
    #[error("Circular dependency: {}", .members.join(" -> "))]
    CircularDependency { members: Vec<String> },
}

impl TopologyIssue {
    /// Whether this issue is a cycle in the dependency graph.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}
