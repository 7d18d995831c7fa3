mod builder;
mod graph;
mod paths;

pub use builder::{build_network, ppm_error, round2, BuildSummary, NetworkBuilder, NetworkError};
pub use graph::{MassDiffEdge, MassDiffGraph, MassDiffNode};
pub use paths::{
    sequences_from_node, PathBudget, PathEnumerator, PathError, SequenceCandidate,
    SequenceReport, DEFAULT_DELIMITER, DEFAULT_MAX_PATHS,
};
