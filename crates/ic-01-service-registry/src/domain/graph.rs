//! Dependency graph over registered systems.
//!
//! Edges point from a system to each of its declared dependencies.
//! Dependencies that are not registered are kept as edges but are not nodes.

use shared_types::ServiceDescriptor;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Registered systems in registration order.
    pub nodes: Vec<String>,
    /// System -> declared dependencies, in declaration order.
    pub edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from descriptors given in registration order.
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a ServiceDescriptor>) -> Self {
        let mut graph = Self::new();
        for descriptor in descriptors {
            graph.add_node(&descriptor.name, descriptor.dependencies.clone());
        }
        graph
    }

    pub fn add_node(&mut self, name: &str, dependencies: Vec<String>) {
        if !self.edges.contains_key(name) {
            self.nodes.push(name.to_string());
        }
        self.edges.insert(name.to_string(), dependencies);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Declared dependencies of `name` that are registered.
    pub fn registered_dependencies(&self, name: &str) -> Vec<&str> {
        self.edges
            .get(name)
            .map(|deps| {
                deps.iter()
                    .filter(|dep| self.contains(dep))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Registered systems that declare `name` as a dependency.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|node| {
                self.edges
                    .get(node.as_str())
                    .is_some_and(|deps| deps.iter().any(|dep| dep == name))
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
