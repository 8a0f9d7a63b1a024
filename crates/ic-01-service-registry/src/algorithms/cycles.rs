//! Cycle detection.
//!
//! DFS with an explicit recursion stack. Reaching a node that is still on
//! the stack closes a cycle; the stack slice from that node is the chain.
//! A search is started from every node so cycles that share members are
//! all reported.

use crate::domain::graph::DependencyGraph;
use std::collections::{BTreeSet, HashSet};

/// Every distinct cycle in the graph.
///
/// Each cycle lists its members in edge order, rotated to start at the
/// lexicographically smallest name. The result is sorted.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let mut found = BTreeSet::new();
    for root in &graph.nodes {
        let mut search = Search {
            graph,
            visited: HashSet::new(),
            stack: Vec::new(),
            found: &mut found,
        };
        search.visit(root);
    }
    found.into_iter().collect()
}

/// Cycles that contain `name`.
pub fn cycles_involving(graph: &DependencyGraph, name: &str) -> Vec<Vec<String>> {
    find_cycles(graph)
        .into_iter()
        .filter(|cycle| cycle.iter().any(|member| member == name))
        .collect()
}

struct Search<'a, 'f> {
    graph: &'a DependencyGraph,
    visited: HashSet<&'a str>,
    stack: Vec<&'a str>,
    found: &'f mut BTreeSet<Vec<String>>,
}

impl<'a> Search<'a, '_> {
    fn visit(&mut self, node: &'a str) {
        self.visited.insert(node);
        self.stack.push(node);

        for dep in self.graph.registered_dependencies(node) {
            if let Some(start) = self.stack.iter().position(|member| *member == dep) {
                let cycle = canonical(&self.stack[start..]);
                self.found.insert(cycle);
            } else if !self.visited.contains(dep) {
                self.visit(dep);
            }
        }

        self.stack.pop();
    }
}

fn canonical(members: &[&str]) -> Vec<String> {
    let start = members
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| **name)
        .map(|(index, _)| index)
        .unwrap_or(0);
    members[start..]
        .iter()
        .chain(members[..start].iter())
        .map(|name| (*name).to_string())
        .collect()
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

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert!(find_cycles(&g).is_empty());
    }

    #[test]
    fn test_three_node_cycle_reports_all_members() {
        let g = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        assert_eq!(find_cycles(&g), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_rotation_starts_at_smallest_name() {
        let g = graph(&[("z", &["m"]), ("m", &["q"]), ("q", &["z"])]);
        assert_eq!(find_cycles(&g), vec![vec!["m", "q", "z"]]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let g = graph(&[("solo", &["solo"])]);
        assert_eq!(find_cycles(&g), vec![vec!["solo"]]);
    }

    #[test]
    fn test_overlapping_cycles_both_reported() {
        // a -> b -> a and b -> c -> b share b
        let g = graph(&[("a", &["b"]), ("b", &["a", "c"]), ("c", &["b"])]);
        let cycles = find_cycles(&g);
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(cycles.contains(&vec!["b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_cycles_involving_filters() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("c", &["a"])]);
        assert_eq!(cycles_involving(&g, "a").len(), 1);
        assert!(cycles_involving(&g, "c").is_empty());
    }

    #[test]
    fn test_unregistered_dependency_is_not_a_cycle() {
        let g = graph(&[("a", &["ghost"])]);
        assert!(find_cycles(&g).is_empty());
    }
}
