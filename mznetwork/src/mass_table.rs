//! Ordered tables of the mass differences a network edge may explain.
use std::fmt::Display;
use std::num::ParseFloatError;
use std::ops::Index;
use std::str::FromStr;

use thiserror::Error;

/// A single named mass difference, e.g. a nucleotide residue.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassEntry {
    pub label: String,
    pub mass: f64,
}

impl MassEntry {
    pub fn new(label: impl Into<String>, mass: f64) -> Self {
        Self {
            label: label.into(),
            mass,
        }
    }
}

impl Display for MassEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.label, self.mass)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MassEntryParseError {
    #[error("Expected a mass entry of the form LABEL=MASS, got {0:?}")]
    MissingSeparator(String),
    #[error("The mass entry label is empty in {0:?}")]
    EmptyLabel(String),
    #[error("Failed to parse mass entry mass {0}")]
    MalformedMass(ParseFloatError),
    #[error("The mass of a mass entry must be finite, got {0}")]
    NonFiniteMass(f64),
}

impl FromStr for MassEntry {
    type Err = MassEntryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, mass) = s
            .split_once('=')
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| MassEntryParseError::MissingSeparator(s.to_string()))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(MassEntryParseError::EmptyLabel(s.to_string()));
        }
        let mass: f64 = mass
            .trim()
            .parse()
            .map_err(MassEntryParseError::MalformedMass)?;
        if !mass.is_finite() {
            return Err(MassEntryParseError::NonFiniteMass(mass));
        }
        Ok(Self::new(label, mass))
    }
}

/// The four canonical RNA nucleotide residue masses
pub const NUCLEOTIDES: [(&str, f64); 4] = [
    ("C", 305.04129),
    ("U", 306.0253),
    ("A", 329.05252),
    ("G", 345.04743),
];

/// The most frequently observed modified nucleotide residue masses
pub const COMMON_MODIFICATIONS: [(&str, f64); 5] = [
    ("D", 308.04095),
    ("mA", 343.06817),
    ("mC", 319.05694),
    ("mG", 359.06308),
    ("mU", 320.04095),
];

/// Residue, isoform and adduct mass differences between intact RNA species, before
/// rounding. [`MassTable::intact_rna_adducts`] rounds them to two decimal places.
pub const INTACT_RNA_ADDUCTS: [(&str, f64); 17] = [
    ("C", 305.0413),
    ("A", 329.0525),
    ("Oxygen", 15.9949),
    ("Me", 14.01565),
    ("2Me", 28.0313),
    ("Y", 358.1599),
    ("Na", 22.989769 - 1.00784),
    ("K", 39.0983 - 1.00784),
    ("H2O", 18.01528),
    ("K-H2O", 19.94),
    ("K+Na-2H", 59.92),
    ("2Na", 43.96),
    ("2K", 75.88),
    ("Ph", 79.97079),
    ("CCA", 2.0 * 305.0413 + 329.0525),
    ("DIPA", 101.19 - 18.01528),
    ("2DIPA", 2.0 * 101.19 - 18.01528),
];

/// An ordered mapping from label to target mass difference.
///
/// Iteration order is insertion order. Re-inserting a label replaces its mass
/// but keeps its original position, so the order in which labels are matched
/// against a mass gap is stable under updates. Tables are values: the
/// `with_*` and `merged` methods return new tables rather than mutating one that
/// may already be shared by an analysis.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "Vec<MassEntry>", into = "Vec<MassEntry>")
)]
pub struct MassTable {
    entries: Vec<MassEntry>,
}

impl MassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nucleotides() -> Self {
        NUCLEOTIDES.iter().map(|(k, v)| (*k, *v)).collect()
    }

    pub fn common_modifications() -> Self {
        COMMON_MODIFICATIONS.iter().map(|(k, v)| (*k, *v)).collect()
    }

    pub fn nucleotides_with_modifications() -> Self {
        Self::nucleotides().merged(&Self::common_modifications())
    }

    pub fn intact_rna_adducts() -> Self {
        INTACT_RNA_ADDUCTS
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect::<Self>()
            .rounded(2)
    }

    /// A copy of this table with every mass rounded to `decimals` decimal places
    pub fn rounded(&self, decimals: i32) -> Self {
        let scale = 10f64.powi(decimals);
        self.iter()
            .map(|e| MassEntry::new(e.label.clone(), (e.mass * scale).round() / scale))
            .collect()
    }

    fn insert_entry(&mut self, entry: MassEntry) {
        match self.entries.iter_mut().find(|e| e.label == entry.label) {
            Some(existing) => existing.mass = entry.mass,
            None => self.entries.push(entry),
        }
    }

    /// A copy of this table with `label` set to `mass`
    pub fn with_entry(&self, label: impl Into<String>, mass: f64) -> Self {
        let mut dup = self.clone();
        dup.insert_entry(MassEntry::new(label, mass));
        dup
    }

    /// A copy of this table updated with every entry of `other`, in `other`'s order.
    pub fn merged(&self, other: &MassTable) -> Self {
        let mut dup = self.clone();
        for entry in other.iter() {
            dup.insert_entry(entry.clone());
        }
        dup
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.mass)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MassEntry> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }
}

impl Index<usize> for MassTable {
    type Output = MassEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl Display for MassTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, e) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<MassEntry> for MassTable {
    fn from_iter<T: IntoIterator<Item = MassEntry>>(iter: T) -> Self {
        let mut this = Self::new();
        for entry in iter {
            this.insert_entry(entry);
        }
        this
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MassTable {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(label, mass)| MassEntry::new(label, mass))
            .collect()
    }
}

impl From<Vec<MassEntry>> for MassTable {
    fn from(value: Vec<MassEntry>) -> Self {
        value.into_iter().collect()
    }
}

impl From<MassTable> for Vec<MassEntry> {
    fn from(value: MassTable) -> Self {
        value.entries
    }
}

impl<'a> IntoIterator for &'a MassTable {
    type Item = &'a MassEntry;

    type IntoIter = std::slice::Iter<'a, MassEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
