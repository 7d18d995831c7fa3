use std::collections::hash_map::Entry;
use std::collections::HashMap;

use identity_hash::BuildIdentityHasher;

use crate::feature::NodeKey;

/// A matched mass difference between two nodes and the evidence for it
#[derive(Debug, Clone, PartialEq)]
pub struct MassDiffEdge {
    pub source: NodeKey,
    pub target: NodeKey,
    /// The mass table label that explained the difference
    pub label: String,
    pub ppm_error: f64,
    pub log_intensity_source: f64,
    pub log_intensity_target: f64,
}

impl MassDiffEdge {
    pub fn new(
        source: NodeKey,
        target: NodeKey,
        label: String,
        ppm_error: f64,
        log_intensity_source: f64,
        log_intensity_target: f64,
    ) -> Self {
        Self {
            source,
            target,
            label,
            ppm_error,
            log_intensity_source,
            log_intensity_target,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    pub target: usize,
    pub edge: usize,
}

#[derive(Debug, Clone)]
pub struct MassDiffNode {
    pub key: NodeKey,
    pub(crate) outgoing: Vec<Link>,
    in_degree: usize,
}

impl MassDiffNode {
    fn new(key: NodeKey) -> Self {
        Self {
            key,
            outgoing: Vec::new(),
            in_degree: 0,
        }
    }

    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    pub fn in_degree(&self) -> usize {
        self.in_degree
    }
}

/// A directed graph of mass differences between nodes.
///
/// There is at most one edge for each ordered pair of nodes. Inserting an edge
/// for a pair that already has one replaces the earlier edge's evidence; parallel
/// edges are never kept, even when several mass table entries explain the same gap.
///
/// Nodes iterate in the order they were first added. Edges iterate grouped by
/// source node in node order, then in the order each source's edges were first
/// added.
#[derive(Debug, Default, Clone)]
pub struct MassDiffGraph {
    nodes: Vec<MassDiffNode>,
    node_index: HashMap<NodeKey, usize, BuildIdentityHasher<NodeKey>>,
    edges: Vec<MassDiffEdge>,
    edge_index: HashMap<(usize, usize), usize>,
}

impl MassDiffGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            node_index: HashMap::with_capacity_and_hasher(capacity, Default::default()),
            edges: Vec::with_capacity(capacity),
            edge_index: HashMap::with_capacity(capacity),
        }
    }

    /// Get the arena index of `key`, creating the node if it is absent
    pub fn add_node(&mut self, key: NodeKey) -> usize {
        match self.node_index.entry(key) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let i = self.nodes.len();
                self.nodes.push(MassDiffNode::new(key));
                v.insert(i);
                i
            }
        }
    }

    /// Add `edge`, creating its endpoints if needed. If the pair already had an
    /// edge it is replaced and returned.
    pub fn insert_edge(&mut self, edge: MassDiffEdge) -> Option<MassDiffEdge> {
        let source = self.add_node(edge.source);
        let target = self.add_node(edge.target);
        match self.edge_index.entry((source, target)) {
            Entry::Occupied(o) => {
                let slot = &mut self.edges[*o.get()];
                Some(std::mem::replace(slot, edge))
            }
            Entry::Vacant(v) => {
                let i = self.edges.len();
                self.edges.push(edge);
                v.insert(i);
                self.nodes[source].outgoing.push(Link { target, edge: i });
                self.nodes[target].in_degree += 1;
                None
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, key: &NodeKey) -> bool {
        self.node_index.contains_key(key)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&MassDiffNode> {
        self.index_of(key).map(|i| &self.nodes[i])
    }

    pub fn edge(&self, source: &NodeKey, target: &NodeKey) -> Option<&MassDiffEdge> {
        let source = self.index_of(source)?;
        let target = self.index_of(target)?;
        self.edge_index
            .get(&(source, target))
            .map(|i| &self.edges[*i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &MassDiffNode> {
        self.nodes.iter()
    }

    pub fn node_keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.iter().map(|n| n.key)
    }

    pub fn edges(&self) -> impl Iterator<Item = &MassDiffEdge> {
        self.nodes
            .iter()
            .flat_map(|n| n.outgoing.iter().map(|link| &self.edges[link.edge]))
    }

    /// The edges leaving `key`, in insertion order
    pub fn edges_from(&self, key: &NodeKey) -> impl Iterator<Item = &MassDiffEdge> {
        self.node(key)
            .into_iter()
            .flat_map(|n| n.outgoing.iter().map(|link| &self.edges[link.edge]))
    }

    pub fn successors(&self, key: &NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        self.node(key)
            .into_iter()
            .flat_map(|n| n.outgoing.iter().map(|link| self.nodes[link.target].key))
    }

    pub(crate) fn index_of(&self, key: &NodeKey) -> Option<usize> {
        self.node_index.get(key).copied()
    }

    pub(crate) fn node_at(&self, index: usize) -> &MassDiffNode {
        &self.nodes[index]
    }

    pub(crate) fn edge_at(&self, index: usize) -> &MassDiffEdge {
        &self.edges[index]
    }
}
