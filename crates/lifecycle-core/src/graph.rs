//! # Dependency Graph
//!
//! Cycle detection over declared feature dependencies.
//!
//! An edge `A → B` means "A depends on B". The graph is not required to be
//! acyclic; cycles are reported so a renderer can draw the graph safely.
//!
//! ## Traversal
//!
//! Depth-first, iterative, starting from every declared feature in
//! declaration order. Reaching a node already on the current path records
//! the path slice from that node plus the node again to close the loop.
//! Fully explored nodes are marked visited for good and never re-entered.
//!
//! ## Completeness
//!
//! This is an approximation meant for visualization, not an enumeration of
//! elementary cycles: a cycle that can only be entered through a node that
//! an earlier traversal already finished is not reported. For
//! `A → [B, C]`, `B → A`, `C → B` only `A → B → A` is found, not
//! `A → C → B → A`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// DEPENDENCY SOURCE TRAIT
// =============================================================================

/// Anything that declares a feature id and its dependencies.
pub trait DependencySource {
    /// The feature's identifier.
    fn feature_id(&self) -> &str;

    /// Identifiers of the features this one depends on.
    fn depends_on(&self) -> &[String];
}

/// Minimal dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureDeps {
    pub feature_id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl FeatureDeps {
    /// Declare a feature and its dependencies.
    #[must_use]
    pub fn new(feature_id: &str, depends_on: &[&str]) -> Self {
        Self {
            feature_id: feature_id.to_string(),
            depends_on: depends_on.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

impl DependencySource for FeatureDeps {
    fn feature_id(&self) -> &str {
        &self.feature_id
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

// =============================================================================
// DEPENDENCY GRAPH
// =============================================================================

/// Adjacency list over interned feature ids.
///
/// Declared features occupy the first indices in declaration order; ids
/// that only appear as dependencies are appended after them and have no
/// outgoing edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node index -> feature id
    ids: Vec<String>,

    /// Reverse lookup: feature id -> node index
    index: BTreeMap<String, usize>,

    /// Outgoing edges per node, in declaration order
    edges: Vec<Vec<usize>>,

    /// Number of declared features (traversal roots)
    declared: usize,
}

impl DependencyGraph {
    /// Build the graph from declarations.
    ///
    /// A feature declared twice keeps its first position and its last
    /// dependency list.
    #[must_use]
    pub fn from_features<'a, F, I>(features: I) -> Self
    where
        F: DependencySource + 'a,
        I: IntoIterator<Item = &'a F>,
    {
        let features: Vec<&F> = features.into_iter().collect();
        let mut graph = Self::default();

        for feature in &features {
            graph.intern(feature.feature_id());
        }
        graph.declared = graph.ids.len();

        for feature in &features {
            let from = graph.intern(feature.feature_id());
            let targets: Vec<usize> = feature
                .depends_on()
                .iter()
                .map(|dep| graph.intern(dep))
                .collect();
            graph.edges[from] = targets;
        }

        graph
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(&node) = self.index.get(id) {
            return node;
        }
        let node = self.ids.len();
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), node);
        self.edges.push(Vec::new());
        node
    }

    /// Number of nodes, including undeclared dependency targets.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of dependency edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Dependencies of a feature, in declaration order.
    #[must_use]
    pub fn dependencies(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&node| self.edges[node].iter().map(|&t| self.ids[t].as_str()).collect())
            .unwrap_or_default()
    }

    /// Find cycles with the visualization-grade traversal described above.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut visited = vec![false; self.ids.len()];
        let mut on_path = vec![false; self.ids.len()];
        let mut cycles = Vec::new();

        for root in 0..self.declared {
            if visited[root] {
                continue;
            }

            // (node, next edge to follow); the stack doubles as the current path
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            visited[root] = true;
            on_path[root] = true;

            while let Some(&(node, cursor)) = stack.last() {
                let Some(&next) = self.edges[node].get(cursor) else {
                    stack.pop();
                    on_path[node] = false;
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 = cursor + 1;
                }

                if on_path[next] {
                    if let Some(start) = stack.iter().position(|&(n, _)| n == next) {
                        let mut cycle: Vec<String> = stack[start..]
                            .iter()
                            .map(|&(n, _)| self.ids[n].clone())
                            .collect();
                        cycle.push(self.ids[next].clone());
                        cycles.push(cycle);
                    }
                } else if !visited[next] {
                    visited[next] = true;
                    on_path[next] = true;
                    stack.push((next, 0));
                }
            }
        }

        cycles
    }
}

/// Find dependency cycles among the given features.
#[must_use]
pub fn detect_cycles<'a, F, I>(features: I) -> Vec<Vec<String>>
where
    F: DependencySource + 'a,
    I: IntoIterator<Item = &'a F>,
{
    DependencyGraph::from_features(features).cycles()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    #[test]
    fn two_node_cycle() {
        let features = [FeatureDeps::new("A", &["B"]), FeatureDeps::new("B", &["A"])];
        assert_eq!(detect_cycles(&features), vec![cycle(&["A", "B", "A"])]);
    }

    #[test]
    fn acyclic_chain_has_no_cycles() {
        let features = [
            FeatureDeps::new("A", &["B"]),
            FeatureDeps::new("B", &["C"]),
            FeatureDeps::new("C", &[]),
        ];
        assert!(detect_cycles(&features).is_empty());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let features = [FeatureDeps::new("A", &["A"])];
        assert_eq!(detect_cycles(&features), vec![cycle(&["A", "A"])]);
    }

    #[test]
    fn cycle_slice_starts_at_reentry_node() {
        let features = [
            FeatureDeps::new("A", &["B"]),
            FeatureDeps::new("B", &["C"]),
            FeatureDeps::new("C", &["B"]),
        ];
        assert_eq!(detect_cycles(&features), vec![cycle(&["B", "C", "B"])]);
    }

    #[test]
    fn cycle_through_finished_node_is_not_reported() {
        let features = [
            FeatureDeps::new("A", &["B", "C"]),
            FeatureDeps::new("B", &["A"]),
            FeatureDeps::new("C", &["B"]),
        ];
        assert_eq!(detect_cycles(&features), vec![cycle(&["A", "B", "A"])]);
    }

    #[test]
    fn unknown_dependencies_are_leaves() {
        let features = [FeatureDeps::new("A", &["ghost"])];
        let graph = DependencyGraph::from_features(&features);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn duplicate_declaration_keeps_last_dependencies() {
        let features = [
            FeatureDeps::new("A", &["B"]),
            FeatureDeps::new("B", &[]),
            FeatureDeps::new("A", &[]),
        ];
        let graph = DependencyGraph::from_features(&features);
        assert!(graph.dependencies("A").is_empty());
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn disjoint_cycles_are_all_found() {
        let features = [
            FeatureDeps::new("A", &["B"]),
            FeatureDeps::new("B", &["A"]),
            FeatureDeps::new("C", &["D"]),
            FeatureDeps::new("D", &["C"]),
        ];
        assert_eq!(
            detect_cycles(&features),
            vec![cycle(&["A", "B", "A"]), cycle(&["C", "D", "C"])]
        );
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let ids: Vec<String> = (0..10_000).map(|i| format!("f{i}")).collect();
        let features: Vec<FeatureDeps> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| FeatureDeps {
                feature_id: id.clone(),
                depends_on: ids.get(i + 1).cloned().into_iter().collect(),
            })
            .collect();
        assert!(detect_cycles(&features).is_empty());
    }
}
