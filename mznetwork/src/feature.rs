//! Deconvoluted features and the filter that decides which of them may take
//! part in a mass difference network.
use std::fmt::Display;
use std::hash::Hash;
use std::num::ParseIntError;
use std::str::FromStr;

use identity_hash::IdentityHashable;
use mzpeaks::{CoordinateLike, Mass};
use thiserror::Error;

/// The behaviors a deconvoluted feature needs to be matched into a network.
///
/// The neutral mass comes from [`CoordinateLike<Mass>`], the rest describe the
/// abundance and elution window of the feature.
pub trait FeatureLike: CoordinateLike<Mass> {
    /// The summed intensity of the feature, in its native precision.
    fn total_intensity(&self) -> f64;

    fn start_time(&self) -> f64;

    fn end_time(&self) -> f64;

    /// The width of the elution window
    fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// The node this feature collapses into
    fn node_key(&self) -> NodeKey {
        NodeKey::from_mass(self.coordinate())
    }
}

/// A single row of a deconvolution feature table
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    pub mass: f64,
    pub intensity: f64,
    pub start_time: f64,
    pub stop_time: f64,
    pub apex_time: Option<f64>,
}

impl Feature {
    pub fn new(mass: f64, intensity: f64, start_time: f64, stop_time: f64) -> Self {
        Self {
            mass,
            intensity,
            start_time,
            stop_time,
            apex_time: None,
        }
    }

    pub fn with_apex_time(mut self, apex_time: f64) -> Self {
        self.apex_time = Some(apex_time);
        self
    }

    /// `log10` of the intensity, or `None` when it is not defined
    pub fn log_intensity(&self) -> Option<f64> {
        log_intensity(self.intensity)
    }
}

impl CoordinateLike<Mass> for Feature {
    fn coordinate(&self) -> f64 {
        self.mass
    }
}

impl FeatureLike for Feature {
    fn total_intensity(&self) -> f64 {
        self.intensity
    }

    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn end_time(&self) -> f64 {
        self.stop_time
    }
}

pub(crate) fn log_intensity(intensity: f64) -> Option<f64> {
    if intensity.is_finite() && intensity > 0.0 {
        Some(intensity.log10())
    } else {
        None
    }
}

/// The identity of a network node, the integer-truncated mass of every feature
/// that falls into it.
///
/// Distinct masses that truncate to the same integer share a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct NodeKey(pub i64);

impl NodeKey {
    pub const PREFIX: &'static str = "M_";

    /// Truncate toward zero, matching an integer cast of the mass
    pub fn from_mass(mass: f64) -> Self {
        Self(mass.trunc() as i64)
    }

    pub fn nominal_mass(&self) -> i64 {
        self.0
    }
}

impl Hash for NodeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_i64(self.0)
    }
}

impl IdentityHashable for NodeKey {}

impl Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeKeyParseError {
    #[error("Node identifier {0:?} does not start with \"M_\"")]
    MissingPrefix(String),
    #[error("Node identifier {0:?} does not end in an integer mass: {1}")]
    MalformedMass(String, ParseIntError),
}

impl FromStr for NodeKey {
    type Err = NodeKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix(Self::PREFIX) {
            Some(mass) => mass
                .parse()
                .map(Self)
                .map_err(|e| NodeKeyParseError::MalformedMass(s.to_string(), e)),
            None => Err(NodeKeyParseError::MissingPrefix(s.to_string())),
        }
    }
}

impl TryFrom<String> for NodeKey {
    type Error = NodeKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeKey> for String {
    fn from(value: NodeKey) -> Self {
        value.to_string()
    }
}

impl From<i64> for NodeKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FilterError {
    #[error("The {0} cutoff must be a finite, non-negative number, got {1}")]
    InvalidCutoff(&'static str, f64),
}

/// Selects the features usable for network construction.
///
/// A feature is kept when its mass is at least `mass_cutoff`, its elution window
/// is no wider than `time_diff_cutoff`, and its intensity is finite and positive
/// so its log-intensity is defined.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureFilter {
    pub mass_cutoff: f64,
    pub time_diff_cutoff: f64,
}

impl Default for FeatureFilter {
    fn default() -> Self {
        Self {
            mass_cutoff: 1500.0,
            time_diff_cutoff: 3.0,
        }
    }
}

impl FeatureFilter {
    pub fn new(mass_cutoff: f64, time_diff_cutoff: f64) -> Result<Self, FilterError> {
        let this = Self {
            mass_cutoff,
            time_diff_cutoff,
        };
        this.validate()?;
        Ok(this)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if !(self.mass_cutoff.is_finite() && self.mass_cutoff >= 0.0) {
            return Err(FilterError::InvalidCutoff("mass", self.mass_cutoff));
        }
        if !(self.time_diff_cutoff.is_finite() && self.time_diff_cutoff >= 0.0) {
            return Err(FilterError::InvalidCutoff(
                "time difference",
                self.time_diff_cutoff,
            ));
        }
        Ok(())
    }

    pub fn accepts<F: FeatureLike>(&self, feature: &F) -> bool {
        feature.coordinate() >= self.mass_cutoff
            && feature.duration() <= self.time_diff_cutoff
            && log_intensity(feature.total_intensity()).is_some()
    }

    /// Copy out the accepted features, preserving their relative order.
    pub fn filter<F: FeatureLike + Clone>(&self, features: &[F]) -> Result<Vec<F>, FilterError> {
        self.validate()?;
        let mut rejected_intensity = 0usize;
        let kept: Vec<F> = features
            .iter()
            .filter(|f| {
                if self.accepts(*f) {
                    true
                } else {
                    if log_intensity(f.total_intensity()).is_none() {
                        rejected_intensity += 1;
                    }
                    false
                }
            })
            .cloned()
            .collect();
        if rejected_intensity > 0 {
            tracing::debug!(
                "Rejected {rejected_intensity} features without a positive intensity"
            );
        }
        tracing::debug!(
            "Kept {} of {} features (mass >= {}, duration <= {})",
            kept.len(),
            features.len(),
            self.mass_cutoff,
            self.time_diff_cutoff
        );
        Ok(kept)
    }
}

/// Filter `features` by `mass_cutoff` and `time_diff_cutoff`, see [`FeatureFilter`].
pub fn filter_features<F: FeatureLike + Clone>(
    features: &[F],
    mass_cutoff: f64,
    time_diff_cutoff: f64,
) -> Result<Vec<F>, FilterError> {
    FeatureFilter::new(mass_cutoff, time_diff_cutoff)?.filter(features)
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_features() -> Vec<Feature> {
        vec![
            Feature::new(2500.3, 1e5, 10.0, 11.0),
            Feature::new(1200.1, 1e6, 10.0, 11.0),
            Feature::new(3100.8, 5e4, 10.0, 14.5),
            Feature::new(1500.0, 2e4, 12.0, 15.0),
            Feature::new(2800.2, 0.0, 12.0, 13.0),
            Feature::new(4100.6, 7e5, 20.0, 21.0),
        ]
    }

    #[test]
    fn test_node_key() {
        assert_eq!(NodeKey::from_mass(1305.99), NodeKey(1305));
        assert_eq!(NodeKey::from_mass(1305.01), NodeKey::from_mass(1305.99));
        assert_eq!(NodeKey::from_mass(1000.0).to_string(), "M_1000");
        let f = Feature::new(1610.05, 1.0, 0.0, 1.0);
        assert_eq!(f.node_key(), NodeKey(1610));
    }

    #[test]
    fn test_node_key_fromstr() {
        let key: NodeKey = "M_1305".parse().unwrap();
        assert_eq!(key, NodeKey(1305));
        assert!(matches!(
            "1305".parse::<NodeKey>(),
            Err(NodeKeyParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            "M_13x".parse::<NodeKey>(),
            Err(NodeKeyParseError::MalformedMass(_, _))
        ));
    }

    #[test]
    fn test_filter() -> Result<(), FilterError> {
        let features = make_features();
        let kept = filter_features(&features, 1500.0, 3.0)?;
        let masses: Vec<f64> = kept.iter().map(|f| f.mass).collect();
        assert_eq!(masses, vec![2500.3, 1500.0, 4100.6]);
        assert_eq!(features.len(), 6);
        Ok(())
    }

    #[test]
    fn test_filter_empty() -> Result<(), FilterError> {
        let kept = filter_features::<Feature>(&[], 0.0, 0.0)?;
        assert!(kept.is_empty());
        let kept = filter_features(&make_features(), 1e6, 100.0)?;
        assert!(kept.is_empty());
        Ok(())
    }

    #[test]
    fn test_filter_invalid_cutoff() {
        assert!(matches!(
            FeatureFilter::new(-1.0, 3.0),
            Err(FilterError::InvalidCutoff("mass", _))
        ));
        assert!(FeatureFilter::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_log_intensity() {
        let f = Feature::new(1000.0, 1000.0, 0.0, 1.0);
        assert!((f.log_intensity().unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(Feature::new(1000.0, -5.0, 0.0, 1.0).log_intensity(), None);
    }
}
