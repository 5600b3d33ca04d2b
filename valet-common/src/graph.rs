//! Generic directed graph over identifiable nodes.
//!
//! Node identity is defined by [`GraphNode::id`], not by pointer or index —
//! callers are free to intern nodes in an arena elsewhere; this graph only
//! ever compares and hashes by id string.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A value that can participate in a [`Graph`].
pub trait GraphNode {
    /// Stable identity string. Two nodes with the same id are the same node.
    fn id(&self) -> &str;
}

impl GraphNode for String {
    fn id(&self) -> &str {
        self
    }
}

/// Errors produced while mutating or sorting a [`Graph`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency graph has a cycle: {from} -> {to}")]
    Cycle { from: String, to: String },
    #[error("node {0} is not present in the graph")]
    UnknownNode(String),
}

/// Directed graph over nodes identified by [`GraphNode::id`].
///
/// Outer iteration order (for `sorted`) follows insertion order; inner edge
/// order follows the order edges were added via [`Graph::depend`]. Neither
/// is a correctness property callers may depend on, but both are stable
/// across runs given the same sequence of calls.
#[derive(Debug, Clone)]
pub struct Graph<T> {
    order: Vec<String>,
    nodes: HashMap<String, T>,
    edges: HashMap<String, Vec<String>>,
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }
}

impl<T: GraphNode + Clone> Graph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `node` with an empty dependency set. No-op if already present.
    pub fn add(&mut self, node: T) -> bool {
        let id = node.id().to_string();
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.order.push(id.clone());
        self.edges.insert(id.clone(), Vec::new());
        self.nodes.insert(id, node);
        true
    }

    /// Record an edge `dependant -> dependency`. Fails if either endpoint is
    /// unknown, and is a no-op (not an error) if the edge already exists.
    pub fn depend(&mut self, dependant: &T, dependency: &T) -> Result<(), GraphError> {
        let from = dependant.id().to_string();
        let to = dependency.id().to_string();
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(GraphError::UnknownNode(to));
        }
        let out = self.edges.get_mut(&from).expect("from present");
        if !out.contains(&to) {
            out.push(to);
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.order.iter().map(move |id| &self.nodes[id])
    }

    /// Direct dependencies of `node`, in the order they were added.
    pub fn immediate_deps(&self, node: &T) -> Vec<T> {
        self.edges
            .get(node.id())
            .into_iter()
            .flatten()
            .map(|id| self.nodes[id].clone())
            .collect()
    }

    /// Transitive closure of dependencies reachable from `node`, excluding
    /// `node` itself.
    pub fn all_deps(&self, node: &T) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.edges.get(node.id()).into_iter().flatten().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if seen.insert(id.to_string()) {
                if let Some(out) = self.edges.get(id) {
                    stack.extend(out.iter().map(String::as_str));
                }
            }
        }
        seen
    }

    /// Reverse-reachable set: every node that depends, directly or
    /// transitively, on `node`. Excludes `node` itself.
    pub fn all_dependants(&self, node: &T) -> HashSet<String> {
        let reverse = self.reverse_edges();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = reverse.get(node.id()).into_iter().flatten().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if seen.insert(id.to_string()) {
                if let Some(out) = reverse.get(id) {
                    stack.extend(out.iter().map(String::as_str));
                }
            }
        }
        seen
    }

    fn reverse_edges(&self) -> HashMap<String, Vec<String>> {
        let mut reverse: HashMap<String, Vec<String>> =
            self.order.iter().map(|id| (id.clone(), Vec::new())).collect();
        for from in &self.order {
            for to in &self.edges[from] {
                reverse.entry(to.clone()).or_default().push(from.clone());
            }
        }
        reverse
    }

    /// Leaves-first topological order: every node precedes its dependants.
    ///
    /// Iterative depth-first traversal with `visited` (post-order emitted)
    /// and `on_stack` (nodes on the current DFS path) marker sets. The first
    /// edge found closing a cycle back onto the current path is reported.
    pub fn sorted(&self) -> Result<Vec<T>, GraphError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::new();
        let mut output: Vec<&str> = Vec::with_capacity(self.order.len());

        // Explicit frame stack: (node, index of next child edge to visit).
        for start in &self.order {
            if visited.contains(start.as_str()) {
                continue;
            }
            let mut frames: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            on_stack.insert(start.as_str());
            while let Some(&mut (node, ref mut next_edge)) = frames.last_mut() {
                let children = &self.edges[node];
                if *next_edge < children.len() {
                    let child = children[*next_edge].as_str();
                    *next_edge += 1;
                    if on_stack.contains(child) {
                        return Err(GraphError::Cycle {
                            from: node.to_string(),
                            to: child.to_string(),
                        });
                    }
                    if !visited.contains(child) {
                        on_stack.insert(child);
                        frames.push((child, 0));
                    }
                } else {
                    visited.insert(node);
                    on_stack.remove(node);
                    output.push(node);
                    frames.pop();
                }
            }
        }

        Ok(output.into_iter().map(|id| self.nodes[id].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct N(&'static str);
    impl GraphNode for N {
        fn id(&self) -> &str {
            self.0
        }
    }

    fn chain() -> Graph<N> {
        let mut g = Graph::new();
        g.add(N("a"));
        g.add(N("b"));
        g.add(N("c"));
        g.depend(&N("a"), &N("b")).unwrap();
        g.depend(&N("b"), &N("c")).unwrap();
        g
    }

    #[test]
    fn sorted_orders_leaves_first() {
        let g = chain();
        let order = g.sorted().unwrap();
        let pos = |id: &str| order.iter().position(|n| n.0 == id).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn sorted_visits_every_node_exactly_once() {
        let mut g = Graph::new();
        for id in ["a", "b", "c", "d"] {
            g.add(N(id));
        }
        g.depend(&N("a"), &N("b")).unwrap();
        g.depend(&N("a"), &N("c")).unwrap();
        g.depend(&N("b"), &N("d")).unwrap();
        g.depend(&N("c"), &N("d")).unwrap();
        let order = g.sorted().unwrap();
        assert_eq!(order.len(), 4);
        let d_pos = order.iter().position(|n| n.0 == "d").unwrap();
        let a_pos = order.iter().position(|n| n.0 == "a").unwrap();
        assert!(d_pos < a_pos);
    }

    #[test]
    fn cycle_is_rejected_with_no_partial_result() {
        let mut g = Graph::new();
        g.add(N("a"));
        g.add(N("b"));
        g.add(N("c"));
        g.depend(&N("a"), &N("b")).unwrap();
        g.depend(&N("b"), &N("c")).unwrap();
        g.depend(&N("c"), &N("a")).unwrap();
        let err = g.sorted().unwrap_err();
        match err {
            GraphError::Cycle { .. } => {}
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn depend_fails_on_unknown_node() {
        let mut g: Graph<N> = Graph::new();
        g.add(N("a"));
        let err = g.depend(&N("a"), &N("missing")).unwrap_err();
        assert_eq!(err, GraphError::UnknownNode("missing".to_string()));
    }

    #[test]
    fn all_deps_is_transitive_and_excludes_self() {
        let g = chain();
        let deps = g.all_deps(&N("a"));
        assert!(deps.contains("b"));
        assert!(deps.contains("c"));
        assert!(!deps.contains("a"));
    }

    #[test]
    fn all_dependants_is_symmetric_on_reversed_edges() {
        let g = chain();
        let dependants = g.all_dependants(&N("c"));
        assert!(dependants.contains("a"));
        assert!(dependants.contains("b"));
        assert!(!dependants.contains("c"));
    }

    #[test]
    fn diamond_all_dependants_reaches_top() {
        let mut g = Graph::new();
        for id in ["app", "b", "c", "d"] {
            g.add(N(id));
        }
        g.depend(&N("app"), &N("b")).unwrap();
        g.depend(&N("app"), &N("c")).unwrap();
        g.depend(&N("b"), &N("d")).unwrap();
        g.depend(&N("c"), &N("d")).unwrap();
        let dependants = g.all_dependants(&N("d"));
        assert_eq!(dependants.len(), 3);
    }

    #[test]
    fn add_is_noop_for_existing_node() {
        let mut g = Graph::new();
        assert!(g.add(N("a")));
        assert!(!g.add(N("a")));
        assert_eq!(g.len(), 1);
    }
}
