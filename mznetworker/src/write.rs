use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use mznetwork::records::{EdgeRecord, FragmentRecord, NetworkElements, NodeRecord, PathRecord};

pub const EDGE_TABLE_NAME: &str = "net.txt";
pub const NODE_TABLE_NAME: &str = "nodes.txt";
pub const PATH_TABLE_NAME: &str = "paths.txt";
pub const FRAGMENT_TABLE_NAME: &str = "fragments.txt";
pub const ELEMENTS_NAME: &str = "network.json";
pub const PARAMS_NAME: &str = "params.toml";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("An IO error occurred writing {0}: {1}")]
    IOError(PathBuf, #[source] io::Error),
    #[error("Failed to write table {0}: {1}")]
    CSVError(PathBuf, #[source] csv::Error),
    #[error("Failed to encode {0} as JSON: {1}")]
    JSONError(PathBuf, #[source] serde_json::Error),
    #[error("Failed to encode {0} as TOML: {1}")]
    TOMLError(PathBuf, #[source] toml::ser::Error),
}

/// Writes the result tables of a run into a single directory
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    pub root: PathBuf,
}

impl OutputDirectory {
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| WriteError::IOError(root.clone(), e))?;
        Ok(Self { root })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn create_file(&self, name: &str) -> Result<(PathBuf, io::BufWriter<fs::File>), WriteError> {
        let path = self.path_for(name);
        let handle = fs::File::create(&path).map_err(|e| WriteError::IOError(path.clone(), e))?;
        Ok((path, io::BufWriter::new(handle)))
    }

    fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf, WriteError> {
        let (path, handle) = self.create_file(name)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_writer(handle);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| WriteError::CSVError(path.clone(), e))?;
        }
        writer
            .flush()
            .map_err(|e| WriteError::IOError(path.clone(), e))?;
        debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }

    pub fn write_edges(&self, edges: &[EdgeRecord]) -> Result<PathBuf, WriteError> {
        self.write_table(EDGE_TABLE_NAME, edges)
    }

    pub fn write_nodes(&self, nodes: &[NodeRecord]) -> Result<PathBuf, WriteError> {
        self.write_table(NODE_TABLE_NAME, nodes)
    }

    pub fn write_paths(&self, paths: &[PathRecord]) -> Result<PathBuf, WriteError> {
        self.write_table(PATH_TABLE_NAME, paths)
    }

    pub fn write_fragments(&self, fragments: &[FragmentRecord]) -> Result<PathBuf, WriteError> {
        self.write_table(FRAGMENT_TABLE_NAME, fragments)
    }

    pub fn write_elements(&self, elements: &NetworkElements) -> Result<PathBuf, WriteError> {
        let (path, mut handle) = self.create_file(ELEMENTS_NAME)?;
        serde_json::to_writer_pretty(&mut handle, elements)
            .map_err(|e| WriteError::JSONError(path.clone(), e))?;
        handle
            .flush()
            .map_err(|e| WriteError::IOError(path.clone(), e))?;
        Ok(path)
    }

    /// Record the parameters a run used next to its results
    pub fn write_params<T: Serialize>(&self, params: &T) -> Result<PathBuf, WriteError> {
        let path = self.path_for(PARAMS_NAME);
        let text =
            toml::to_string_pretty(params).map_err(|e| WriteError::TOMLError(path.clone(), e))?;
        fs::write(&path, text).map_err(|e| WriteError::IOError(path.clone(), e))?;
        info!("Parameters written to {}", path.display());
        Ok(path)
    }
}

/// Whether `path` names an existing directory with results in it
pub fn has_results(path: &Path) -> bool {
    path.join(EDGE_TABLE_NAME).exists()
}
