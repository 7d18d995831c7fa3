use std::time::{Duration, Instant};

use itertools::Itertools;
use thiserror::Error;

use crate::feature::NodeKey;

use super::graph::MassDiffGraph;

pub const DEFAULT_DELIMITER: &str = "-";
pub const DEFAULT_MAX_PATHS: usize = 1_000_000;

/// How often the clock is consulted while exploring paths
const TIME_CHECK_INTERVAL: usize = 1024;

/// Limits on the work a path search may do before giving up.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathBudget {
    /// The maximum number of partial paths to explore, whether or not they are kept
    pub max_paths: Option<usize>,
    pub max_duration: Option<Duration>,
}

impl Default for PathBudget {
    fn default() -> Self {
        Self {
            max_paths: Some(DEFAULT_MAX_PATHS),
            max_duration: None,
        }
    }
}

impl PathBudget {
    pub fn new(max_paths: Option<usize>, max_duration: Option<Duration>) -> Self {
        Self {
            max_paths,
            max_duration,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("Path search explored {explored} paths, exceeding its limit of {limit}")]
    BudgetExhausted { explored: usize, limit: usize },
    #[error("Path search ran for {elapsed:0.3?} after exploring {explored} paths, exceeding its limit of {limit:0.3?}")]
    TimedOut {
        explored: usize,
        elapsed: Duration,
        limit: Duration,
    },
}

/// A simple path through the network and the evidence along it
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceCandidate {
    pub nodes: Vec<NodeKey>,
    pub labels: Vec<String>,
    pub ppm_errors: Vec<f64>,
}

impl SequenceCandidate {
    pub fn edge_count(&self) -> usize {
        self.labels.len()
    }

    /// `start` followed by each edge label
    pub fn label_sequence(&self, delimiter: &str) -> String {
        std::iter::once("start")
            .chain(self.labels.iter().map(|s| s.as_str()))
            .join(delimiter)
    }

    /// `ppm` followed by each edge's ppm error
    pub fn ppm_sequence(&self, delimiter: &str) -> String {
        std::iter::once("ppm".to_string())
            .chain(self.ppm_errors.iter().map(|e| format_ppm(*e)))
            .join(delimiter)
    }

    pub fn node_sequence(&self, delimiter: &str) -> String {
        self.nodes.iter().join(delimiter)
    }
}

/// Whole numbers keep one decimal place, `2.0` rather than `2`
fn format_ppm(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: usize,
    /// The position in `node`'s adjacency list to try next
    cursor: usize,
    /// The edge used to reach `node`, absent for the start node
    via: Option<usize>,
}

/// Enumerates every simple path leaving a start node.
///
/// The traversal is an iterative depth first search over a stack of [`Frame`]s
/// with a visited mask for the nodes on the current path, cleared as frames are
/// popped. Every partial path explored counts against the [`PathBudget`].
#[derive(Debug, Clone)]
pub struct PathEnumerator<'a> {
    graph: &'a MassDiffGraph,
    budget: PathBudget,
}

impl<'a> PathEnumerator<'a> {
    pub fn new(graph: &'a MassDiffGraph, budget: PathBudget) -> Self {
        Self { graph, budget }
    }

    fn candidate_from(&self, stack: &[Frame]) -> SequenceCandidate {
        let nodes = stack
            .iter()
            .map(|f| self.graph.node_at(f.node).key)
            .collect();
        let (labels, ppm_errors) = stack
            .iter()
            .filter_map(|f| f.via)
            .map(|i| {
                let edge = self.graph.edge_at(i);
                (edge.label.clone(), edge.ppm_error)
            })
            .unzip();
        SequenceCandidate {
            nodes,
            labels,
            ppm_errors,
        }
    }

    /// Find all simple paths from `start` with at least `min_edges` edges.
    ///
    /// Paths are grouped by their final node in graph node order, and within a group
    /// appear in depth first order. An absent `start` yields no paths.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn paths_from(
        &self,
        start: &NodeKey,
        min_edges: usize,
    ) -> Result<Vec<SequenceCandidate>, PathError> {
        let Some(start_index) = self.graph.index_of(start) else {
            tracing::debug!("Start node {start} is not in the network");
            return Ok(Vec::new());
        };
        let started = Instant::now();
        let min_edges = min_edges.max(1);

        let mut on_path = vec![false; self.graph.node_count()];
        let mut stack = vec![Frame {
            node: start_index,
            cursor: 0,
            via: None,
        }];
        on_path[start_index] = true;

        let mut explored = 0usize;
        let mut found: Vec<(usize, SequenceCandidate)> = Vec::new();

        while let Some(frame) = stack.last_mut() {
            let outgoing = &self.graph.node_at(frame.node).outgoing;
            if frame.cursor >= outgoing.len() {
                on_path[frame.node] = false;
                stack.pop();
                continue;
            }
            let link = outgoing[frame.cursor];
            frame.cursor += 1;
            if on_path[link.target] {
                continue;
            }

            explored += 1;
            if let Some(limit) = self.budget.max_paths {
                if explored > limit {
                    return Err(PathError::BudgetExhausted { explored, limit });
                }
            }
            if let Some(limit) = self.budget.max_duration {
                if explored % TIME_CHECK_INTERVAL == 0 {
                    let elapsed = started.elapsed();
                    if elapsed > limit {
                        return Err(PathError::TimedOut {
                            explored,
                            elapsed,
                            limit,
                        });
                    }
                }
            }

            on_path[link.target] = true;
            stack.push(Frame {
                node: link.target,
                cursor: 0,
                via: Some(link.edge),
            });
            if stack.len() - 1 >= min_edges {
                found.push((link.target, self.candidate_from(&stack)));
            }
        }

        found.sort_by_key(|(target, _)| *target);
        tracing::debug!(
            "Explored {explored} paths from {start}, kept {} with at least {min_edges} edges",
            found.len()
        );
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }
}

/// Three aligned lists rendering each path as delimited text
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SequenceReport {
    pub label_sequences: Vec<String>,
    pub node_sequences: Vec<String>,
    pub ppm_sequences: Vec<String>,
}

impl SequenceReport {
    pub fn from_candidates(candidates: &[SequenceCandidate], delimiter: &str) -> Self {
        let mut this = Self {
            label_sequences: Vec::with_capacity(candidates.len()),
            node_sequences: Vec::with_capacity(candidates.len()),
            ppm_sequences: Vec::with_capacity(candidates.len()),
        };
        for c in candidates {
            this.label_sequences.push(c.label_sequence(delimiter));
            this.node_sequences.push(c.node_sequence(delimiter));
            this.ppm_sequences.push(c.ppm_sequence(delimiter));
        }
        this
    }

    pub fn len(&self) -> usize {
        self.label_sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.label_sequences
            .iter()
            .zip(self.node_sequences.iter())
            .zip(self.ppm_sequences.iter())
            .map(|((l, n), p)| (l.as_str(), n.as_str(), p.as_str()))
    }
}

/// Enumerate the paths from `start` with at least `min_edges` edges and render them
/// with [`DEFAULT_DELIMITER`].
pub fn sequences_from_node(
    graph: &MassDiffGraph,
    start: &NodeKey,
    min_edges: usize,
    budget: PathBudget,
) -> Result<SequenceReport, PathError> {
    let paths = PathEnumerator::new(graph, budget).paths_from(start, min_edges)?;
    Ok(SequenceReport::from_candidates(&paths, DEFAULT_DELIMITER))
}
