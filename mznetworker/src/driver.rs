use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::{Deserialize, Serialize};

use thiserror::Error;

use tracing::{debug, info, warn};

use mznetwork::network::{
    NetworkBuilder, NetworkError, PathBudget, PathEnumerator, PathError, SequenceCandidate,
    SequenceReport, DEFAULT_DELIMITER, DEFAULT_MAX_PATHS,
};
use mznetwork::records::{
    edge_table, fragment_table, node_table, path_table, NetworkElements, RecordError,
};
use mznetwork::{
    Feature, FeatureFilter, FilterError, MassDiffGraph, MassEntry, MassTable, NodeKey,
};

use crate::args::{non_negative_float, positive_float, ArgMassTable};
use crate::load::{
    infer_table_format, read_edge_table, read_features, read_mass_table, LoadError,
};
use crate::progress::ProgressRecord;
use crate::write::{has_results, OutputDirectory, WriteError, EDGE_TABLE_NAME};

pub const DEFAULT_MASS_CUTOFF: f64 = 1500.0;
pub const DEFAULT_TIME_DIFF_CUTOFF: f64 = 3.0;
pub const DEFAULT_SIMILARITY_CUTOFF: f64 = 0.03;
pub const DEFAULT_MIN_EDGES: usize = 3;

#[derive(Debug, Error)]
pub enum MZNetworkerError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to load the configuration: {0}")]
    ConfigError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error(transparent)]
    LoadError(#[from] LoadError),
    #[error(transparent)]
    WriteError(#[from] WriteError),
    #[error(transparent)]
    FilterError(#[from] FilterError),
    #[error(transparent)]
    NetworkError(#[from] NetworkError),
    #[error(transparent)]
    PathError(#[from] PathError),
    #[error(transparent)]
    RecordError(#[from] RecordError),
}

/// Build a mass difference network from a deconvoluted feature table.
///
/// Read a feature table, link every pair of features whose mass difference matches
/// a residue mass, and write out the edge and node tables of the network. When a
/// start node is given, every simple path from it is written out as a candidate
/// sequence.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MZNetworker {
    /// The path to read the feature table from, a .csv or tab separated .txt/.tsv file,
    /// optionally gzipped.
    ///
    /// With `--from-network`, a previously written edge table or the directory it
    /// was written to.
    #[arg()]
    pub input_file: PathBuf,

    /// The directory to write the result tables to
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mznetworker.toml` in the working directory.
    /// Environment variables prefixed with `MZNETWORKER_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The minimum monoisotopic mass of a feature
    #[arg(
        short = 'm',
        long = "mass-cutoff",
        default_value_t = DEFAULT_MASS_CUTOFF,
        value_parser = non_negative_float,
    )]
    pub mass_cutoff: f64,

    /// The maximum elution time span of a feature, in minutes
    #[arg(
        short = 't',
        long = "time-diff-cutoff",
        default_value_t = DEFAULT_TIME_DIFF_CUTOFF,
        value_parser = non_negative_float,
    )]
    pub time_diff_cutoff: f64,

    /// The absolute mass error tolerated between a mass difference and a residue mass
    #[arg(
        short = 's',
        long = "similarity-cutoff",
        default_value_t = DEFAULT_SIMILARITY_CUTOFF,
        value_parser = positive_float,
    )]
    pub similarity_cutoff: f64,

    /// The built-in mass table to match mass differences against
    #[arg(short = 'a', long = "mass-table", default_value = "nucleotides")]
    pub mass_table: ArgMassTable,

    /// A `key,mass` table to use instead of the built-in mass table
    #[arg(short = 'f', long = "mass-table-file")]
    pub mass_table_file: Option<PathBuf>,

    /// Treat the input as an edge table written by an earlier run instead of a
    /// feature table
    #[arg(short = 'n', long = "from-network")]
    pub from_network: bool,

    /// The node to enumerate candidate sequences from, denoted M_(mass)
    #[arg(short = 'p', long = "start-node", value_parser = NodeKey::from_str)]
    pub start_node: Option<NodeKey>,

    /// The minimum number of edges in a candidate sequence
    #[arg(short = 'c', long = "min-edges", default_value_t = DEFAULT_MIN_EDGES)]
    pub min_edges: usize,

    /// The maximum number of partial paths to explore before giving up
    #[arg(long = "max-paths", default_value_t = DEFAULT_MAX_PATHS)]
    pub max_paths: usize,

    /// The maximum number of seconds to spend searching for paths
    #[arg(long = "max-search-time", value_parser = non_negative_float)]
    pub max_search_time: Option<f64>,

    /// An additional mass difference to match, denoted LABEL=MASS. May be repeated.
    #[arg(short = 'x', long = "extra-mass", value_parser = MassEntry::from_str)]
    pub extra_masses: Vec<MassEntry>,
}

impl Default for MZNetworker {
    fn default() -> Self {
        Self {
            input_file: PathBuf::new(),
            output_dir: PathBuf::from("."),
            log_file: None,
            config_file: None,
            mass_cutoff: DEFAULT_MASS_CUTOFF,
            time_diff_cutoff: DEFAULT_TIME_DIFF_CUTOFF,
            similarity_cutoff: DEFAULT_SIMILARITY_CUTOFF,
            mass_table: ArgMassTable::default(),
            mass_table_file: None,
            from_network: false,
            start_node: None,
            min_edges: DEFAULT_MIN_EDGES,
            max_paths: DEFAULT_MAX_PATHS,
            max_search_time: None,
            extra_masses: Vec::new(),
        }
    }
}

impl MZNetworker {
    fn feature_filter(&self) -> Result<FeatureFilter, FilterError> {
        FeatureFilter::new(self.mass_cutoff, self.time_diff_cutoff)
    }

    fn path_budget(&self) -> PathBudget {
        let max_duration = self.max_search_time.and_then(|t| {
            let limit = Duration::try_from_secs_f64(t).ok();
            if limit.is_none() {
                warn!("Ignoring invalid path search time limit {t}");
            }
            limit
        });
        PathBudget::new(Some(self.max_paths), max_duration)
    }

    /// The mass table to match against, with any extra masses applied on top
    pub fn build_mass_table(&self) -> Result<MassTable, MZNetworkerError> {
        let (mut table, decimals) = match self.mass_table_file.as_ref() {
            Some(path) => (read_mass_table(path)?, None),
            None => (self.mass_table.into(), self.mass_table.decimals()),
        };
        for entry in self.extra_masses.iter() {
            table = table.with_entry(entry.label.clone(), entry.mass);
        }
        if let Some(decimals) = decimals {
            table = table.rounded(decimals);
        }
        if table.is_empty() {
            warn!("The mass table is empty, no mass differences will be matched");
        }
        info!("Mass Table: {table}");
        Ok(table)
    }

    /// Build the network and return it with the features it was built from
    fn generate_network(
        &self,
        progress: &mut ProgressRecord,
    ) -> Result<(MassDiffGraph, Vec<Feature>), MZNetworkerError> {
        let filter = self.feature_filter()?;
        let table = self.build_mass_table()?;

        let (features, dropped) = read_features(&self.input_file)?;
        progress.features_read += features.len() + dropped;
        progress.features_dropped += dropped;

        let kept = filter.filter(&features)?;
        progress.features_kept += kept.len();
        info!(
            "Kept {} of {} features with mass >= {} and duration <= {}",
            kept.len(),
            features.len(),
            filter.mass_cutoff,
            filter.time_diff_cutoff
        );

        let builder = NetworkBuilder::new(&table, self.similarity_cutoff)?;
        let (graph, summary) = builder.build_with_summary(&kept)?;
        progress.update_from_build(&summary);
        Ok((graph, kept))
    }

    fn network_path(&self) -> PathBuf {
        if self.from_network && has_results(&self.input_file) {
            self.input_file.join(EDGE_TABLE_NAME)
        } else {
            self.input_file.clone()
        }
    }

    fn read_network(&self) -> Result<MassDiffGraph, MZNetworkerError> {
        let path = self.network_path();
        info!("Reading network from {}", path.display());
        let records = read_edge_table(&path)?;
        Ok(MassDiffGraph::from_edge_records(&records)?)
    }

    fn find_sequences(
        &self,
        graph: &MassDiffGraph,
        start: &NodeKey,
    ) -> Result<Vec<SequenceCandidate>, MZNetworkerError> {
        if !graph.contains_node(start) {
            warn!("Start node {start} is not in the network, no sequences can be found");
        }
        let started = Instant::now();
        let paths =
            PathEnumerator::new(graph, self.path_budget()).paths_from(start, self.min_edges)?;
        debug!("Path search took {:0.3?}", started.elapsed());
        Ok(paths)
    }

    pub fn main(&self) -> Result<(), MZNetworkerError> {
        info!(
            "mznetworker v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file.display());
        info!("Output: {}", self.output_dir.display());
        let start = Instant::now();

        infer_table_format(&self.network_path())?;
        let mut progress = ProgressRecord::default();

        let (graph, features) = if self.from_network {
            (self.read_network()?, None)
        } else {
            let (graph, features) = self.generate_network(&mut progress)?;
            (graph, Some(features))
        };
        let output = OutputDirectory::create(&self.output_dir)?;
        progress.nodes = graph.node_count();
        progress.edges = graph.edge_count();
        info!(
            "Network generated with {} nodes and {} edges",
            progress.nodes, progress.edges
        );

        let edges = edge_table(&graph);
        if !self.from_network {
            output.write_edges(&edges)?;
            output.write_nodes(&node_table(&edges))?;
            info!(
                "Features: {} | Dropped Incomplete: {} | Kept: {}",
                progress.features_read, progress.features_dropped, progress.features_kept
            );
            info!(
                "Pairs Examined: {} | Overwritten Edges: {}",
                progress.pairs_examined, progress.overwritten_edges
            );
        }
        output.write_elements(&NetworkElements::from_edge_records(&edges))?;

        if let Some(start_node) = self.start_node.as_ref() {
            let candidates = self.find_sequences(&graph, start_node)?;
            let report = SequenceReport::from_candidates(&candidates, DEFAULT_DELIMITER);
            progress.paths = report.len();
            info!(
                "Found {} sequences from {start_node} with at least {} edges",
                progress.paths, self.min_edges
            );
            for (labels, nodes, _) in report.iter().take(10) {
                debug!("{labels} | {nodes}");
            }
            output.write_paths(&path_table(&report)?)?;
            if let Some(features) = features.as_ref() {
                output.write_fragments(&fragment_table(features, &candidates))?;
            }
        }

        output.write_params(self)?;
        info!("Elapsed Time: {:0.3?}", start.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = MZNetworker::parse_from([
            "mznetworker",
            "features.csv",
            "-s",
            "0.02",
            "-a",
            "nucleotides-with-modifications",
            "-x",
            "m22G=373.0787",
            "-x",
            "U=306.5",
            "-p",
            "M_1500",
        ]);
        assert_eq!(args.similarity_cutoff, 0.02);
        assert_eq!(args.mass_cutoff, DEFAULT_MASS_CUTOFF);
        assert_eq!(args.start_node, Some(NodeKey(1500)));
        assert_eq!(args.extra_masses.len(), 2);

        let table = args.build_mass_table().unwrap();
        assert_eq!(table.len(), 10);
        assert_eq!(table.get("U"), Some(306.5));
        assert_eq!(table[9].label, "m22G");
    }

    #[test]
    fn test_path_budget() {
        let args = MZNetworker::parse_from([
            "mznetworker",
            "features.csv",
            "--max-search-time",
            "0.5",
            "--max-paths",
            "200",
        ]);
        let budget = args.path_budget();
        assert_eq!(budget.max_duration, Some(Duration::from_millis(500)));
        assert_eq!(budget.max_paths, Some(200));

        let budget = MZNetworker::parse_from(["mznetworker", "features.csv"]).path_budget();
        assert_eq!(budget, PathBudget::default());
    }

    #[test]
    fn test_intact_rna_extra_masses_are_rounded() {
        let args = MZNetworker::parse_from([
            "mznetworker",
            "features.csv",
            "-a",
            "intact-rna-adducts",
            "-x",
            "Li=6.94123",
        ]);
        let table = args.build_mass_table().unwrap();
        assert_eq!(table.len(), 18);
        assert_eq!(table.get("Li"), Some(6.94));
        assert_eq!(table.get("Ph"), Some(79.97));
    }

    #[test]
    fn test_reject_bad_args() {
        assert!(MZNetworker::try_parse_from(["mznetworker", "f.csv", "-s", "0"]).is_err());
        assert!(MZNetworker::try_parse_from(["mznetworker", "f.csv", "-p", "1500"]).is_err());
        assert!(MZNetworker::try_parse_from(["mznetworker", "f.csv", "-x", "G"]).is_err());
    }

    #[test]
    fn test_defaults_match() {
        let parsed = MZNetworker::parse_from(["mznetworker", "features.csv"]);
        let default = MZNetworker {
            input_file: "features.csv".into(),
            ..Default::default()
        };
        assert_eq!(parsed.output_dir, default.output_dir);
        assert_eq!(parsed.similarity_cutoff, default.similarity_cutoff);
        assert_eq!(parsed.time_diff_cutoff, default.time_diff_cutoff);
        assert_eq!(parsed.min_edges, default.min_edges);
        assert_eq!(parsed.max_paths, default.max_paths);
        assert_eq!(parsed.mass_table, default.mass_table);
    }
}
