//! Start-up ordering with Kahn's topological sort.
//!
//! Dependencies come before their dependents. Among systems that are ready
//! at the same time, registration order wins, so the result is deterministic.

use crate::domain::errors::RegistryError;
use crate::domain::graph::DependencyGraph;
use std::collections::{HashMap, VecDeque};

/// Order in which registered systems can be started.
///
/// Unregistered dependencies are ignored. Fails if any system sits on or
/// behind a cycle.
pub fn startup_order(graph: &DependencyGraph) -> Result<Vec<String>, RegistryError> {
    // 1. In-degree = number of registered dependencies
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &graph.nodes {
        let deps = graph.registered_dependencies(node);
        in_degree.insert(node.as_str(), deps.len());
        for dep in deps {
            dependents.entry(dep).or_default().push(node.as_str());
        }
    }

    // 2. Seed with systems that depend on nothing registered
    let mut ready: VecDeque<&str> = graph
        .nodes
        .iter()
        .map(String::as_str)
        .filter(|node| in_degree.get(node) == Some(&0))
        .collect();

    // 3. Release dependents as their dependencies are placed
    let mut order = Vec::with_capacity(graph.len());
    while let Some(node) = ready.pop_front() {
        order.push(node.to_string());
        let Some(waiting) = dependents.get(node) else {
            continue;
        };
        for dependent in waiting {
            let Some(degree) = in_degree.get_mut(dependent) else {
                continue;
            };
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                ready.push_back(*dependent);
            }
        }
    }

    // 4. Anything left over is blocked by a cycle
    if order.len() < graph.len() {
        let remaining = graph
            .nodes
            .iter()
            .filter(|node| !order.contains(node))
            .cloned()
            .collect();
        return Err(RegistryError::CycleDetected { remaining });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ServiceDescriptor;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let descriptors: Vec<ServiceDescriptor> = edges
            .iter()
            .map(|(name, deps)| {
                deps.iter()
                    .fold(ServiceDescriptor::new(*name), |d, dep| d.depends_on(*dep))
            })
            .collect();
        DependencyGraph::from_descriptors(&descriptors)
    }

    /// Test: A → B → C (A depends on B, B on C)
    #[test]
    fn test_chain_starts_dependencies_first() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(startup_order(&g).unwrap(), vec!["c", "b", "a"]);
    }

    /// Test: Diamond
    ///     top
    ///    /   \
    ///  left  right
    ///    \   /
    ///    base
    #[test]
    fn test_diamond_keeps_registration_order_among_peers() {
        let g = graph(&[
            ("top", &["left", "right"]),
            ("right", &["base"]),
            ("left", &["base"]),
            ("base", &[]),
        ]);
        assert_eq!(startup_order(&g).unwrap(), vec!["base", "right", "left", "top"]);
    }

    #[test]
    fn test_cycle_reports_blocked_systems() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("free", &[]), ("tail", &["a"])]);
        let err = startup_order(&g).unwrap_err();
        assert_eq!(
            err,
            RegistryError::CycleDetected {
                remaining: vec!["a".into(), "b".into(), "tail".into()]
            }
        );
    }

    #[test]
    fn test_empty_graph() {
        assert!(startup_order(&DependencyGraph::new()).unwrap().is_empty());
    }
}
