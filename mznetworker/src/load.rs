use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use mznetwork::records::EdgeRecord;
use mznetwork::{Feature, MassEntry, MassTable};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("An IO error occurred reading {0}: {1}")]
    IOError(PathBuf, #[source] io::Error),
    #[error("Failed to parse {0}: {1}")]
    CSVError(PathBuf, #[source] csv::Error),
    #[error("The file type of {0} is not supported, expected .csv, .tsv, .txt or .tab, optionally gzipped")]
    UnsupportedFileType(PathBuf),
}

/// The delimited text layouts a table may be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Comma,
    Tab,
}

impl TableFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Tab => b'\t',
        }
    }
}

/// Infer the table format from a path's extension and whether it is gzip compressed
pub fn infer_table_format(path: &Path) -> Result<(TableFormat, bool), LoadError> {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let (name, compressed) = match name.strip_suffix(".gz") {
        Some(stem) => (stem.to_string(), true),
        None => (name, false),
    };
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match ext {
        "csv" => Ok((TableFormat::Comma, compressed)),
        "tsv" | "txt" | "tab" => Ok((TableFormat::Tab, compressed)),
        _ => Err(LoadError::UnsupportedFileType(path.to_path_buf())),
    }
}

fn open_table(path: &Path) -> Result<csv::Reader<Box<dyn io::Read>>, LoadError> {
    let (format, compressed) = infer_table_format(path)?;
    debug!("Reading {} as {format:?} (compressed? {compressed})", path.display());
    let handle =
        fs::File::open(path).map_err(|e| LoadError::IOError(path.to_path_buf(), e))?;
    let handle = io::BufReader::new(handle);
    let stream: Box<dyn io::Read> = if compressed {
        Box::new(GzDecoder::new(handle))
    } else {
        Box::new(handle)
    };
    Ok(csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(stream))
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, LoadError> {
    let mut reader = open_table(path)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| LoadError::CSVError(path.to_path_buf(), e))
}

/// A row of a deconvoluted feature table. Values that are missing or not numbers
/// are read as absent.
#[derive(Debug, Clone, Deserialize)]
struct FeatureRow {
    #[serde(rename = "Monoisotopic Mass", default, deserialize_with = "csv::invalid_option")]
    mass: Option<f64>,
    #[serde(rename = "Sum Intensity", default, deserialize_with = "csv::invalid_option")]
    intensity: Option<f64>,
    #[serde(rename = "Start Time (min)", default, deserialize_with = "csv::invalid_option")]
    start_time: Option<f64>,
    #[serde(rename = "Stop Time (min)", default, deserialize_with = "csv::invalid_option")]
    stop_time: Option<f64>,
    #[serde(rename = "Apex RT", default, deserialize_with = "csv::invalid_option")]
    apex_time: Option<f64>,
}

impl FeatureRow {
    fn complete(&self) -> Option<Feature> {
        let feature = Feature::new(
            self.mass?,
            self.intensity?,
            self.start_time?,
            self.stop_time?,
        );
        Some(match self.apex_time {
            Some(apex) => feature.with_apex_time(apex),
            None => feature,
        })
    }
}

/// Read a feature table, dropping rows with any required value missing.
///
/// Returns the complete features and the number of rows dropped.
pub fn read_features(path: &Path) -> Result<(Vec<Feature>, usize), LoadError> {
    let rows: Vec<FeatureRow> = read_rows(path)?;
    let total = rows.len();
    let features: Vec<Feature> = rows.iter().filter_map(FeatureRow::complete).collect();
    let dropped = total - features.len();
    if dropped > 0 {
        warn!(
            "Dropped {dropped} of {total} rows with missing values from {}",
            path.display()
        );
    }
    Ok((features, dropped))
}

#[derive(Debug, Clone, Deserialize)]
struct MassTableRow {
    key: String,
    mass: f64,
}

/// Read a two column `key,mass` table, in file order
pub fn read_mass_table(path: &Path) -> Result<MassTable, LoadError> {
    let rows: Vec<MassTableRow> = read_rows(path)?;
    let table: MassTable = rows
        .into_iter()
        .map(|row| MassEntry::new(row.key, row.mass))
        .collect();
    debug!("Read {} mass differences from {}", table.len(), path.display());
    Ok(table)
}

/// Read a previously written edge table
pub fn read_edge_table(path: &Path) -> Result<Vec<EdgeRecord>, LoadError> {
    read_rows(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_infer_table_format() {
        assert_eq!(
            infer_table_format(Path::new("features.csv")).unwrap(),
            (TableFormat::Comma, false)
        );
        assert_eq!(
            infer_table_format(Path::new("dir.v2/features.TXT.gz")).unwrap(),
            (TableFormat::Tab, true)
        );
        assert!(matches!(
            infer_table_format(Path::new("features.xlsx")),
            Err(LoadError::UnsupportedFileType(_))
        ));
        assert!(infer_table_format(Path::new("features")).is_err());
    }

    #[test_log::test]
    fn test_read_features() -> Result<(), LoadError> {
        let (features, dropped) = read_features(Path::new("tests/data/features.tsv"))?;
        assert_eq!(features.len(), 6);
        assert_eq!(dropped, 1);
        assert_eq!(features[0].mass, 1000.0);
        assert_eq!(features[0].apex_time, Some(10.5));
        Ok(())
    }

    #[test]
    fn test_read_mass_table() -> Result<(), LoadError> {
        let table = read_mass_table(Path::new("tests/data/mass_table.csv"))?;
        assert_eq!(table.labels().collect::<Vec<_>>(), vec!["C", "U", "A", "G"]);
        assert_eq!(table.get("A"), Some(329.05252));
        Ok(())
    }
}
