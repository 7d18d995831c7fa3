use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use mznetwork::MassTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgMassTable {
    #[default]
    /// The four canonical RNA nucleotides
    Nucleotides,
    /// The canonical nucleotides followed by the most common modified nucleotides
    NucleotidesWithModifications,
    /// Intact RNA isoforms and adducts, rounded to two decimal places. Usually run
    /// with a mass cutoff near 17500 and a similarity cutoff near 0.4
    IntactRnaAdducts,
    /// No built-in masses, only those read from a file or given as extra masses
    Empty,
}

impl From<ArgMassTable> for MassTable {
    fn from(value: ArgMassTable) -> Self {
        match value {
            ArgMassTable::Nucleotides => MassTable::nucleotides(),
            ArgMassTable::NucleotidesWithModifications => {
                MassTable::nucleotides_with_modifications()
            }
            ArgMassTable::IntactRnaAdducts => MassTable::intact_rna_adducts(),
            ArgMassTable::Empty => MassTable::new(),
        }
    }
}

impl ArgMassTable {
    /// The precision every mass of this table is kept at, including masses added to it
    pub fn decimals(&self) -> Option<i32> {
        match self {
            Self::IntactRnaAdducts => Some(2),
            _ => None,
        }
    }
}

impl Display for ArgMassTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub(crate) fn positive_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if !(value.is_finite() && value > 0.0) {
        Err(format!("`{s}` is not greater than zero"))
    } else {
        Ok(value)
    }
}

pub(crate) fn non_negative_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if !(value.is_finite() && value >= 0.0) {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mass_table_choice() {
        let table: MassTable = ArgMassTable::NucleotidesWithModifications.into();
        assert_eq!(table.len(), 9);
        let table: MassTable = ArgMassTable::Empty.into();
        assert!(table.is_empty());
        assert_eq!(
            ArgMassTable::from_str("nucleotides-with-modifications", true).unwrap(),
            ArgMassTable::NucleotidesWithModifications
        );
        let table: MassTable = ArgMassTable::from_str("intact-rna-adducts", true)
            .unwrap()
            .into();
        assert_eq!(table.len(), 17);
        assert_eq!(table.get("Oxygen"), Some(15.99));
        assert_eq!(ArgMassTable::IntactRnaAdducts.decimals(), Some(2));
        assert_eq!(ArgMassTable::Nucleotides.decimals(), None);
    }

    #[test]
    fn test_float_parsers() {
        assert_eq!(positive_float("0.02"), Ok(0.02));
        assert!(positive_float("0").is_err());
        assert!(positive_float("x").is_err());
        assert_eq!(non_negative_float("0"), Ok(0.0));
        assert!(non_negative_float("-1.5").is_err());
    }
}
