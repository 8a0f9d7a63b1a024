//! # Dependency Validator
//!
//! Checks a system's declared interface against the registry and current
//! health. Validation always returns a report; problems are report entries.

use crate::algorithms::find_cycles;
use crate::application::registry::ServiceRegistry;
use crate::domain::report::ValidationReport;
use crate::ports::outbound::HealthLookup;
use shared_types::{HealthStatus, TopologyIssue};
use std::sync::Arc;
use tracing::debug;

pub struct DependencyValidator {
    registry: Arc<ServiceRegistry>,
    health: Arc<dyn HealthLookup>,
}

impl DependencyValidator {
    pub fn new(registry: Arc<ServiceRegistry>, health: Arc<dyn HealthLookup>) -> Self {
        Self { registry, health }
    }

    /// Validate one system.
    ///
    /// Checks, in order: every dependency is registered; every registered
    /// dependency is HEALTHY; every subscribed kind has a publisher other
    /// than the system itself; the dependency graph has no cycle.
    pub fn validate(&self, name: &str) -> ValidationReport {
        let mut report = ValidationReport::new(name);
        let Some(descriptor) = self.registry.get(name) else {
            report.push_issue(TopologyIssue::UnknownSystem(name.to_string()));
            report.recommend(format!("Register '{name}' before validating it"));
            return report;
        };

        for dependency in &descriptor.dependencies {
            if !self.registry.contains(dependency) {
                report.push_issue(TopologyIssue::MissingDependency {
                    system: name.to_string(),
                    dependency: dependency.clone(),
                });
                report.recommend(format!("Register '{dependency}' required by '{name}'"));
                continue;
            }
            let status = self.health.status_of(dependency);
            if status != HealthStatus::Healthy {
                report.push_issue(TopologyIssue::UnhealthyDependency {
                    system: name.to_string(),
                    dependency: dependency.clone(),
                    status,
                });
                report.recommend(format!(
                    "Check health of '{dependency}' (currently {status})"
                ));
            }
        }

        for kind in &descriptor.subscribes {
            let has_publisher = self
                .registry
                .publishers_of(kind)
                .iter()
                .any(|publisher| publisher != name);
            if !has_publisher {
                report.push_issue(TopologyIssue::MissingPublisher {
                    system: name.to_string(),
                    kind: kind.clone(),
                });
                report.recommend(format!(
                    "Register a system that publishes '{kind}' or drop the subscription"
                ));
            }
        }

        // Any cycle in the graph invalidates every report
        for cycle in self.find_cycles() {
            report.recommend(format!(
                "Break the circular dependency {}",
                cycle.join(" -> ")
            ));
            report.push_issue(TopologyIssue::CircularDependency { members: cycle });
        }

        debug!(system = %name, valid = report.valid, issues = report.issues.len(), "Validation finished");
        report
    }

    /// Validate every registered system, in registration order.
    pub fn validate_all(&self) -> Vec<ValidationReport> {
        self.registry
            .list()
            .iter()
            .map(|descriptor| self.validate(&descriptor.name))
            .collect()
    }

    /// Every cycle in the current dependency graph.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        find_cycles(&self.registry.graph())
    }
}
