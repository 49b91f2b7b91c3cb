//! Generic dependency graph with topological ordering.
//!
//! [`DependencyGraph`] is a pure data structure: it knows nothing about
//! steps or chains, only about uniquely-keyed nodes and "depends on"
//! edges between them. Validity (acyclicity) is enforced when an order
//! is requested, not when edges are inserted.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Result, StepchainError};

/// A single node in a [`DependencyGraph`]: a unique key plus the value
/// it carries.
#[derive(Debug)]
pub struct GraphNode<T> {
    key: String,
    value: T,
    /// Indices of nodes this node depends on.
    depends_on: Vec<usize>,
    /// Indices of nodes that depend on this node.
    dependents: Vec<usize>,
}

impl<T> GraphNode<T> {
    /// The node's unique key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value carried by this node.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Directed graph of uniquely-keyed nodes and dependency edges.
///
/// Nodes are kept in insertion order; [`topological_order`] breaks ties
/// by that order, so results are deterministic across runs with
/// identical insertions.
///
/// [`topological_order`]: DependencyGraph::topological_order
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<GraphNode<T>>,
    index: HashMap<String, usize>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DependencyGraph<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a node under a unique key.
    ///
    /// Fails with [`StepchainError::DuplicateKey`] if the key is taken.
    pub fn add_node(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        if self.index.contains_key(&key) {
            return Err(StepchainError::DuplicateKey { key });
        }
        self.index.insert(key.clone(), self.nodes.len());
        self.nodes.push(GraphNode {
            key,
            value,
            depends_on: Vec::new(),
            dependents: Vec::new(),
        });
        Ok(())
    }

    /// Look up a node by key.
    ///
    /// Fails with [`StepchainError::NodeNotFound`] if no node has the key.
    pub fn node(&self, key: &str) -> Result<&GraphNode<T>> {
        self.resolve(key).map(|i| &self.nodes[i])
    }

    /// Check if a node exists under the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record that `from` depends on `to`.
    ///
    /// Both endpoints must already be nodes. Duplicate edges are
    /// collapsed. A cycle introduced here is not an error until an
    /// order is requested.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        if self.nodes[from].depends_on.contains(&to) {
            return Ok(());
        }
        self.nodes[from].depends_on.push(to);
        self.nodes[to].dependents.push(from);
        Ok(())
    }

    /// Returns nodes in topological order (dependencies before dependents).
    ///
    /// Ties among unconstrained nodes break by insertion order; a graph
    /// with no edges comes back exactly in insertion order. Fails with
    /// [`StepchainError::CircularDependency`] if no valid order exists.
    pub fn topological_order(&self) -> Result<Vec<&GraphNode<T>>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.depends_on.len()).collect();

        // Min-heap on node index keeps the ready set in insertion order.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse(i)) = ready.pop() {
            order.push(&self.nodes[i]);

            for &dependent in &self.nodes[i].dependents {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        // Any node left with a positive in-degree sits on a cycle.
        if order.len() != self.nodes.len() {
            let remaining: Vec<&str> = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, n)| n.key.as_str())
                .collect();

            return Err(StepchainError::CircularDependency {
                cycle: remaining.join(" -> "),
            });
        }

        Ok(order)
    }

    fn resolve(&self, key: &str) -> Result<usize> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| StepchainError::NodeNotFound { key: key.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<T>(order: &[&GraphNode<T>]) -> Vec<String> {
        order.iter().map(|n| n.key().to_string()).collect()
    }

    #[test]
    fn empty_graph_orders_to_nothing() {
        let graph: DependencyGraph<()> = DependencyGraph::new();
        assert!(graph.is_empty());
        assert!(graph.topological_order().unwrap().is_empty());
    }

    #[test]
    fn single_node_orders_to_itself() {
        let mut graph = DependencyGraph::new();
        graph.add_node("only", 1).unwrap();

        let order = graph.topological_order().unwrap();
        assert_eq!(keys(&order), vec!["only"]);
        assert_eq!(*order[0].value(), 1);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ()).unwrap();

        let result = graph.add_node("a", ());
        assert!(matches!(
            result,
            Err(StepchainError::DuplicateKey { key }) if key == "a"
        ));
    }

    #[test]
    fn node_lookup_finds_registered_key() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", 7).unwrap();

        assert_eq!(*graph.node("a").unwrap().value(), 7);
        assert!(graph.contains("a"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn node_lookup_fails_for_unknown_key() {
        let graph: DependencyGraph<()> = DependencyGraph::new();
        assert!(matches!(
            graph.node("ghost"),
            Err(StepchainError::NodeNotFound { key }) if key == "ghost"
        ));
    }

    #[test]
    fn edge_with_unknown_endpoint_is_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ()).unwrap();

        assert!(graph.add_edge("a", "missing").is_err());
        assert!(graph.add_edge("missing", "a").is_err());
    }

    #[test]
    fn no_edges_returns_insertion_order() {
        let mut graph = DependencyGraph::new();
        for name in ["third", "first", "second"] {
            graph.add_node(name, ()).unwrap();
        }

        let order = graph.topological_order().unwrap();
        assert_eq!(keys(&order), vec!["third", "first", "second"]);
    }

    #[test]
    fn linear_chain_orders_dependencies_first() {
        let mut graph = DependencyGraph::new();
        graph.add_node("first", ()).unwrap();
        graph.add_node("second", ()).unwrap();
        graph.add_node("third", ()).unwrap();
        graph.add_edge("second", "first").unwrap();
        graph.add_edge("third", "second").unwrap();

        let order = keys(&graph.topological_order().unwrap());
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn diamond_orders_every_dependency_before_its_dependent() {
        let mut graph = DependencyGraph::new();
        for name in ["a", "b", "c", "d"] {
            graph.add_node(name, ()).unwrap();
        }
        graph.add_edge("b", "a").unwrap();
        graph.add_edge("c", "a").unwrap();
        graph.add_edge("d", "b").unwrap();
        graph.add_edge("d", "c").unwrap();

        let order = keys(&graph.topological_order().unwrap());
        let pos = |k: &str| order.iter().position(|s| s == k).unwrap();

        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ()).unwrap();
        graph.add_node("b", ()).unwrap();
        graph.add_edge("b", "a").unwrap();
        graph.add_edge("b", "a").unwrap();

        let order = keys(&graph.topological_order().unwrap());
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ()).unwrap();
        graph.add_node("b", ()).unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", "a").unwrap();

        let result = graph.topological_order();
        assert!(matches!(
            result,
            Err(StepchainError::CircularDependency { .. })
        ));
    }

    #[test]
    fn self_cycle_is_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", ()).unwrap();
        graph.add_edge("a", "a").unwrap();

        let result = graph.topological_order();
        assert!(matches!(
            result,
            Err(StepchainError::CircularDependency { cycle }) if cycle.contains('a')
        ));
    }

    #[test]
    fn cycle_error_names_the_nodes_involved() {
        let mut graph = DependencyGraph::new();
        for name in ["a", "b", "c", "free"] {
            graph.add_node(name, ()).unwrap();
        }
        graph.add_edge("a", "c").unwrap();
        graph.add_edge("b", "a").unwrap();
        graph.add_edge("c", "b").unwrap();

        match graph.topological_order() {
            Err(StepchainError::CircularDependency { cycle }) => {
                assert!(cycle.contains('a'));
                assert!(cycle.contains('b'));
                assert!(cycle.contains('c'));
                assert!(!cycle.contains("free"));
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn identical_insertions_produce_identical_orders() {
        let build = || {
            let mut graph = DependencyGraph::new();
            for name in ["e", "d", "c", "b", "a"] {
                graph.add_node(name, ()).unwrap();
            }
            graph.add_edge("a", "e").unwrap();
            graph.add_edge("b", "e").unwrap();
            graph
        };

        let first = keys(&build().topological_order().unwrap());
        let second = keys(&build().topological_order().unwrap());
        assert_eq!(first, second);
    }
}
