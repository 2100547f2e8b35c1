//! Weighted dependency graph over queries, mutations and objects.

pub mod builder;
pub mod dot;
pub mod node;

pub use builder::build_dependency_graph;
pub use node::{Node, NodeBody, NodeId, NodeKind};

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Weight of a produces/requires edge.
pub const HARD_EDGE_WEIGHT: u32 = 100;
/// Weight of an optional ordering preference.
pub const SOFT_EDGE_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    index: HashMap<(NodeKind, String), NodeId>,
    edges: Vec<Edge>,
    successors: Vec<Vec<NodeId>>,
    in_degree: Vec<usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, returning the existing id if `(kind, name)` is known.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let key = (node.kind, node.name.clone());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.in_degree.push(0);
        self.index.insert(key, id);
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: u32) {
        self.edges.push(Edge { from, to, weight });
        self.in_degree[to] += 1;
        if !self.successors[from].contains(&to) {
            self.successors[from].push(to);
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn find(&self, kind: NodeKind, name: &str) -> Option<NodeId> {
        self.index.get(&(kind, name.to_string())).copied()
    }

    /// Finds an operation node by name, queries before mutations.
    pub fn find_operation(&self, name: &str) -> Option<NodeId> {
        self.find(NodeKind::Query, name).or_else(|| self.find(NodeKind::Mutation, name))
    }

    /// Distinct successors in insertion order.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id]
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.in_degree[id]
    }

    /// In-degree normalized by the number of other nodes.
    pub fn in_degree_centrality(&self, id: NodeId) -> f64 {
        if self.nodes.len() <= 1 {
            return 0.0;
        }
        self.in_degree[id] as f64 / (self.nodes.len() - 1) as f64
    }

    /// Nodes a traversal pass starts from: those with zero in-degree
    /// centrality, or, failing that, those under the next lowest centrality
    /// threshold. A random node is the last resort.
    pub fn starter_nodes<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<NodeId> {
        let centrality: Vec<f64> = (0..self.nodes.len()).map(|id| self.in_degree_centrality(id)).collect();
        let mut thresholds = centrality.clone();
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        for threshold in thresholds {
            let starters: Vec<NodeId> = (0..self.nodes.len())
                .filter(|&id| centrality[id] <= threshold)
                .collect();
            if !starters.is_empty() {
                return starters;
            }
        }
        let ids: Vec<NodeId> = (0..self.nodes.len()).collect();
        ids.choose(rng).copied().into_iter().collect()
    }
}
