//! Tabular views of a mass difference network, as exported and re-imported by
//! downstream tools.
use std::collections::{HashMap, HashSet};

use identity_hash::BuildIdentityHasher;
use thiserror::Error;

use crate::feature::{Feature, FeatureLike, NodeKey, NodeKeyParseError};
use crate::network::{round2, MassDiffEdge, MassDiffGraph, SequenceCandidate, SequenceReport};

pub const EDGE_KIND: &str = "massdiff";
pub const NODE_KIND: &str = "mass";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Malformed node in edge table row {row}: {source}")]
    MalformedNode {
        row: usize,
        #[source]
        source: NodeKeyParseError,
    },
    #[error("Path sequences are not aligned: {labels} label, {nodes} node and {ppms} ppm sequences")]
    LengthMismatch {
        labels: usize,
        nodes: usize,
        ppms: usize,
    },
}

/// One row of the edge table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeRecord {
    #[cfg_attr(feature = "serde", serde(rename = "Node1"))]
    pub node1: String,
    pub edge: String,
    #[cfg_attr(feature = "serde", serde(rename = "Node2"))]
    pub node2: String,
    pub base: String,
    pub ppm: f64,
    #[cfg_attr(feature = "serde", serde(rename = "log-intensity1"))]
    pub log_intensity1: f64,
    #[cfg_attr(feature = "serde", serde(rename = "log-intensity2"))]
    pub log_intensity2: f64,
}

impl From<&MassDiffEdge> for EdgeRecord {
    fn from(edge: &MassDiffEdge) -> Self {
        Self {
            node1: edge.source.to_string(),
            edge: EDGE_KIND.to_string(),
            node2: edge.target.to_string(),
            base: edge.label.clone(),
            ppm: edge.ppm_error,
            log_intensity1: round2(edge.log_intensity_source),
            log_intensity2: round2(edge.log_intensity_target),
        }
    }
}

/// One row of the node table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    #[cfg_attr(feature = "serde", serde(rename = "Node"))]
    pub node: String,
    #[cfg_attr(feature = "serde", serde(rename = "log-intensity"))]
    pub log_intensity: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathRecord {
    pub label_sequence: String,
    pub node_sequence: String,
    pub ppm_sequence: String,
}

/// One feature lying on a candidate sequence, annotated with the residue that
/// reached it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FragmentRecord {
    /// The 1-based position of the sequence among all candidates
    #[cfg_attr(feature = "serde", serde(rename = "Group"))]
    pub group: usize,
    #[cfg_attr(feature = "serde", serde(rename = "NodeName"))]
    pub node: String,
    #[cfg_attr(feature = "serde", serde(rename = "Base"))]
    pub base: String,
    #[cfg_attr(feature = "serde", serde(rename = "Monoisotopic Mass"))]
    pub mass: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Sum Intensity"))]
    pub intensity: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Apex RT"))]
    pub apex_time: Option<f64>,
}

/// Join every node of every candidate back to the features it was built from.
///
/// The start node of a sequence is labeled `start`, every later node with the label
/// of the edge that reached it. A node collecting several features yields one row per
/// feature, in input order, and nodes without features yield nothing.
pub fn fragment_table(
    features: &[Feature],
    candidates: &[SequenceCandidate],
) -> Vec<FragmentRecord> {
    let mut by_node: HashMap<NodeKey, Vec<&Feature>, BuildIdentityHasher<NodeKey>> =
        HashMap::default();
    for f in features {
        by_node.entry(f.node_key()).or_default().push(f);
    }

    let mut rows = Vec::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let bases = std::iter::once("start").chain(candidate.labels.iter().map(|s| s.as_str()));
        for (key, base) in candidate.nodes.iter().zip(bases) {
            let Some(members) = by_node.get(key) else {
                continue;
            };
            rows.extend(members.iter().map(|f| FragmentRecord {
                group: i + 1,
                node: key.to_string(),
                base: base.to_string(),
                mass: f.mass,
                intensity: f.intensity,
                apex_time: f.apex_time,
            }));
        }
    }
    rows
}

/// The edge table of `graph`, in graph edge order
pub fn edge_table(graph: &MassDiffGraph) -> Vec<EdgeRecord> {
    graph.edges().map(EdgeRecord::from).collect()
}

/// The distinct `(node, log-intensity)` pairs of an edge table.
///
/// Every source endpoint is listed before any target endpoint, and only the first
/// occurrence of a pair is kept, with `-0.0` and `0.0` counted as equal. A node whose
/// features disagree on intensity may appear more than once.
pub fn node_table(edges: &[EdgeRecord]) -> Vec<NodeRecord> {
    let mut seen = HashSet::new();
    edges
        .iter()
        .map(|e| (&e.node1, e.log_intensity1))
        .chain(edges.iter().map(|e| (&e.node2, e.log_intensity2)))
        .filter(|(node, value)| seen.insert(((*node).clone(), (value + 0.0).to_bits())))
        .map(|(node, log_intensity)| NodeRecord {
            node: node.clone(),
            log_intensity,
        })
        .collect()
}

pub fn path_table(report: &SequenceReport) -> Result<Vec<PathRecord>, RecordError> {
    let labels = report.label_sequences.len();
    let nodes = report.node_sequences.len();
    let ppms = report.ppm_sequences.len();
    if labels != nodes || labels != ppms {
        return Err(RecordError::LengthMismatch {
            labels,
            nodes,
            ppms,
        });
    }
    Ok(report
        .iter()
        .map(|(l, n, p)| PathRecord {
            label_sequence: l.to_string(),
            node_sequence: n.to_string(),
            ppm_sequence: p.to_string(),
        })
        .collect())
}

impl MassDiffGraph {
    /// Rebuild a graph from a previously exported edge table.
    ///
    /// Rows are inserted in order, so a repeated node pair keeps its last row.
    pub fn from_edge_records(records: &[EdgeRecord]) -> Result<Self, RecordError> {
        let mut graph = Self::with_capacity(records.len());
        for (row, rec) in records.iter().enumerate() {
            let parse = |s: &str| {
                s.parse::<NodeKey>()
                    .map_err(|source| RecordError::MalformedNode { row, source })
            };
            let edge = MassDiffEdge::new(
                parse(&rec.node1)?,
                parse(&rec.node2)?,
                rec.base.clone(),
                rec.ppm,
                rec.log_intensity1,
                rec.log_intensity2,
            );
            graph.insert_edge(edge);
        }
        tracing::debug!(
            "Read {} nodes and {} edges from {} edge records",
            graph.node_count(),
            graph.edge_count(),
            records.len()
        );
        Ok(graph)
    }
}

/// A graph element wrapped the way link analysis viewers expect it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Element<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeData {
    pub id: String,
    pub intensity: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub ppm: f64,
    pub base: String,
    pub label: String,
}

/// The node and edge lists of a network visualization document
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkElements {
    pub nodes: Vec<Element<NodeData>>,
    pub edges: Vec<Element<EdgeData>>,
}

impl NetworkElements {
    pub fn from_edge_records(edges: &[EdgeRecord]) -> Self {
        let nodes = node_table(edges)
            .into_iter()
            .map(|n| Element {
                data: NodeData {
                    id: n.node,
                    intensity: n.log_intensity,
                    label: NODE_KIND.to_string(),
                },
            })
            .collect();
        let edges = edges
            .iter()
            .map(|e| Element {
                data: EdgeData {
                    id: format!("{}-{}", e.node1, e.node2),
                    source: e.node1.clone(),
                    target: e.node2.clone(),
                    ppm: e.ppm,
                    base: e.base.clone(),
                    label: EDGE_KIND.to_string(),
                },
            })
            .collect();
        Self { nodes, edges }
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl From<&MassDiffGraph> for NetworkElements {
    fn from(graph: &MassDiffGraph) -> Self {
        Self::from_edge_records(&edge_table(graph))
    }
}
