//! # Topology Scenarios
//!
//! Registry, dependency validator and health monitor working together.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use ic_01_service_registry::{DependencyValidator, HealthLookup, ServiceRegistry};
    use proptest::prelude::*;
    use shared_bus::RecordingPublisher;
    use shared_types::{HealthStatus, ServiceDescriptor, TopologyIssue};

    use crate::integration::support::{fast_config, harness};

    struct AllHealthy;

    impl HealthLookup for AllHealthy {
        fn status_of(&self, _system: &str) -> HealthStatus {
            HealthStatus::Healthy
        }
    }

    fn validator() -> (Arc<ServiceRegistry>, DependencyValidator) {
        let registry = Arc::new(ServiceRegistry::new(Arc::new(RecordingPublisher::new())));
        let validator = DependencyValidator::new(registry.clone(), Arc::new(AllHealthy));
        (registry, validator)
    }

    #[tokio::test]
    async fn test_missing_dependency_resolved_by_registration() {
        let h = harness(fast_config()).await;
        let c = &h.coordinator;

        c.register_system(ServiceDescriptor::new("A").depends_on("B"));
        let report = c.validate_integration("A");
        assert!(!report.valid);
        assert!(report.issues.iter().any(|issue| matches!(
            issue,
            TopologyIssue::MissingDependency { dependency, .. } if dependency == "B"
        )));
        assert!(report.recommendations.iter().any(|r| r.contains("'B'")));

        c.register_system(ServiceDescriptor::new("B"));
        // B must be known-healthy before A's integration is valid
        c.perform_health_check("B").await.unwrap();
        let report = c.validate_integration("A");
        assert!(report.valid, "{report}");
    }

    #[test]
    fn test_three_cycle_reported_from_every_member() {
        let (registry, validator) = validator();
        registry.register(ServiceDescriptor::new("A").depends_on("B"));
        registry.register(ServiceDescriptor::new("B").depends_on("C"));
        registry.register(ServiceDescriptor::new("C").depends_on("A"));

        for name in ["A", "B", "C"] {
            let report = validator.validate(name);
            assert!(!report.valid);
            let members = report
                .issues
                .iter()
                .find_map(|issue| match issue {
                    TopologyIssue::CircularDependency { members } => Some(members.clone()),
                    _ => None,
                })
                .expect("cycle issue");
            let members: HashSet<&str> = members.iter().map(String::as_str).collect();
            assert_eq!(members, HashSet::from(["A", "B", "C"]));
        }
        assert!(registry.init_order().is_err());
    }

    #[test]
    fn test_cycle_breaks_when_member_leaves() {
        let (registry, validator) = validator();
        registry.register(ServiceDescriptor::new("A").depends_on("B"));
        registry.register(ServiceDescriptor::new("B").depends_on("A"));
        assert!(!validator.validate("A").valid);

        registry.register(ServiceDescriptor::new("B"));
        assert!(validator.validate("A").valid);
        assert_eq!(registry.init_order().unwrap(), vec!["B".to_string(), "A".to_string()]);
    }

    fn node(i: usize) -> String {
        format!("s{i}")
    }

    proptest! {
        #[test]
        fn prop_valid_implies_resolvable_and_acyclic(
            size in 2usize..7,
            edges in prop::collection::vec((0usize..8, 0usize..8), 0..14),
        ) {
            let (registry, validator) = validator();
            // Targets >= size are never registered
            for i in 0..size {
                let mut descriptor = ServiceDescriptor::new(node(i));
                for (from, to) in &edges {
                    if *from == i && *to != i {
                        descriptor = descriptor.depends_on(node(*to));
                    }
                }
                registry.register(descriptor);
            }

            for report in validator.validate_all() {
                if report.valid {
                    let descriptor = registry.get(&report.system).unwrap();
                    for dependency in &descriptor.dependencies {
                        prop_assert!(registry.contains(dependency));
                    }
                    prop_assert!(validator.find_cycles().is_empty());
                }
            }
        }
    }
}
