//! Mass difference networks over deconvoluted mass spectrometry features.
//!
//! Features whose neutral masses differ by a known residue mass, e.g. a nucleotide,
//! are linked from lighter to heavier in a directed graph. Walking the simple paths
//! of that graph from a chosen feature spells out candidate sequences.
//!
//! ```
//! use mznetwork::prelude::*;
//!
//! let features = vec![
//!     Feature::new(1000.0, 1e5, 10.0, 11.0),
//!     Feature::new(1305.04, 2e5, 10.0, 11.5),
//!     Feature::new(1634.1, 1e5, 10.5, 12.0),
//! ];
//! let kept = filter_features(&features, 900.0, 3.0).unwrap();
//! let graph = build_network(&kept, &MassTable::nucleotides(), 0.02).unwrap();
//! let report = sequences_from_node(&graph, &NodeKey(1000), 2, PathBudget::default()).unwrap();
//! assert_eq!(report.label_sequences, vec!["start-C-A"]);
//! ```
pub mod feature;
pub mod mass_table;
pub mod network;
pub mod records;

pub use feature::{filter_features, Feature, FeatureFilter, FeatureLike, FilterError, NodeKey};
pub use mass_table::{MassEntry, MassTable};
pub use network::{
    build_network, sequences_from_node, MassDiffEdge, MassDiffGraph, NetworkBuilder,
    NetworkError, PathBudget, PathEnumerator, PathError, SequenceReport,
};
pub use records::{
    edge_table, fragment_table, node_table, path_table, NetworkElements, RecordError,
};

pub mod prelude {
    pub use crate::feature::{FeatureLike, NodeKey};
    pub use crate::mass_table::MassTable;
    pub use crate::network::{build_network, sequences_from_node, PathBudget};
    pub use crate::{filter_features, Feature};
}
