use itertools::Itertools;
use thiserror::Error;

use crate::feature::{log_intensity, FeatureLike, NodeKey};
use crate::mass_table::MassTable;

use super::graph::{MassDiffEdge, MassDiffGraph};

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NetworkError {
    #[error("The similarity cutoff must be a finite, positive mass, got {0}")]
    InvalidTolerance(f64),
    #[error("The feature at mass {mass} has intensity {intensity}, whose log-intensity is undefined")]
    NonPositiveIntensity { mass: f64, intensity: f64 },
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The relative error of an observed mass gap against a target, in parts-per-million
/// of the lighter mass, rounded to two decimal places.
pub fn ppm_error(observed_diff: f64, target_diff: f64, lower_mass: f64, upper_mass: f64) -> f64 {
    round2((observed_diff - target_diff).abs() / lower_mass.min(upper_mass) * 1e6)
}

/// Counts of the work done while building a network
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BuildSummary {
    pub features: usize,
    pub pairs: usize,
    pub matches: usize,
    /// Matches that replaced an earlier match for the same pair of nodes
    pub overwritten: usize,
}

#[derive(Debug, Clone, Copy)]
struct MatchPoint {
    mass: f64,
    log_intensity: f64,
    key: NodeKey,
}

/// Builds a [`MassDiffGraph`] by testing every pair of features against a
/// [`MassTable`].
///
/// Features are sorted by mass, and for every lighter/heavier pair, every table
/// entry is tried in table order. A pair matches an entry when the gap differs from
/// the entry's mass by strictly less than `similarity_cutoff`. Each match adds or
/// replaces the edge from the lighter feature's node to the heavier feature's node,
/// so when several entries match one pair, the last one in table order is kept.
///
/// The work is quadratic in the number of features and linear in the size of the
/// table, without any pruning.
#[derive(Debug, Clone, Copy)]
pub struct NetworkBuilder<'a> {
    pub mass_table: &'a MassTable,
    pub similarity_cutoff: f64,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(mass_table: &'a MassTable, similarity_cutoff: f64) -> Result<Self, NetworkError> {
        if !(similarity_cutoff.is_finite() && similarity_cutoff > 0.0) {
            return Err(NetworkError::InvalidTolerance(similarity_cutoff));
        }
        Ok(Self {
            mass_table,
            similarity_cutoff,
        })
    }

    fn prepare<F: FeatureLike>(&self, features: &[F]) -> Result<Vec<MatchPoint>, NetworkError> {
        let mut points = features
            .iter()
            .map(|f| {
                let mass = f.coordinate();
                let intensity = f.total_intensity();
                match log_intensity(intensity) {
                    Some(log_intensity) => Ok(MatchPoint {
                        mass,
                        log_intensity,
                        key: NodeKey::from_mass(mass),
                    }),
                    None => Err(NetworkError::NonPositiveIntensity { mass, intensity }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        points.sort_by(|a, b| a.mass.total_cmp(&b.mass));
        Ok(points)
    }

    pub fn build<F: FeatureLike>(&self, features: &[F]) -> Result<MassDiffGraph, NetworkError> {
        self.build_with_summary(features).map(|(graph, _)| graph)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build_with_summary<F: FeatureLike>(
        &self,
        features: &[F],
    ) -> Result<(MassDiffGraph, BuildSummary), NetworkError> {
        let points = self.prepare(features)?;
        let mut graph = MassDiffGraph::with_capacity(points.len());
        let mut summary = BuildSummary {
            features: points.len(),
            ..Default::default()
        };

        for (lower, upper) in points.iter().tuple_combinations() {
            summary.pairs += 1;
            let diff = upper.mass - lower.mass;
            for entry in self.mass_table.iter() {
                if (diff - entry.mass).abs() < self.similarity_cutoff {
                    summary.matches += 1;
                    let edge = MassDiffEdge::new(
                        lower.key,
                        upper.key,
                        entry.label.clone(),
                        ppm_error(diff, entry.mass, lower.mass, upper.mass),
                        lower.log_intensity,
                        upper.log_intensity,
                    );
                    if let Some(prev) = graph.insert_edge(edge) {
                        summary.overwritten += 1;
                        tracing::trace!(
                            "{} -> {} was {} and is now {}",
                            prev.source,
                            prev.target,
                            prev.label,
                            entry.label
                        );
                    }
                }
            }
        }

        tracing::debug!(
            "Matched {} of {} feature pairs against {} mass differences, {} matches overwritten",
            summary.matches,
            summary.pairs,
            self.mass_table.len(),
            summary.overwritten
        );
        Ok((graph, summary))
    }
}

/// Build the mass difference network of `features` against `mass_table`,
/// see [`NetworkBuilder`].
pub fn build_network<F: FeatureLike>(
    features: &[F],
    mass_table: &MassTable,
    similarity_cutoff: f64,
) -> Result<MassDiffGraph, NetworkError> {
    NetworkBuilder::new(mass_table, similarity_cutoff)?.build(features)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feature::Feature;

    fn make_table() -> MassTable {
        vec![("C", 305.0413), ("U", 306.0254), ("A", 329.05), ("G", 345.05)]
            .into_iter()
            .collect()
    }

    fn make_features(masses: &[f64]) -> Vec<Feature> {
        masses
            .iter()
            .map(|m| Feature::new(*m, 1e5, 10.0, 11.0))
            .collect()
    }

    #[test]
    fn test_ppm_error() {
        let diff = 1305.04 - 1000.0;
        let ppm = ppm_error(diff, 305.0413, 1000.0, 1305.04);
        assert!((ppm - 1.30).abs() < 1e-9, "{ppm}");
    }

    #[test_log::test]
    fn test_end_to_end() -> Result<(), NetworkError> {
        let table = make_table();
        let features = make_features(&[1634.1, 1000.0, 1305.04]);
        let graph = build_network(&features, &table, 0.02)?;
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let first = graph.edge(&NodeKey(1000), &NodeKey(1305)).unwrap();
        assert_eq!(first.label, "C");
        assert!((first.ppm_error - 1.3).abs() < 1e-9);
        assert!((first.log_intensity_source - 5.0).abs() < 1e-9);

        let second = graph.edge(&NodeKey(1305), &NodeKey(1634)).unwrap();
        assert_eq!(second.label, "A");

        let graph = build_network(&features, &table, 0.001)?;
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.is_empty());
        Ok(())
    }

    #[test]
    fn test_gap_outside_tolerance() -> Result<(), NetworkError> {
        let graph = build_network(&make_features(&[1000.0, 1305.04, 1610.05]), &make_table(), 0.02)?;
        let edges: Vec<_> = graph.edges().map(|e| (e.source.0, e.target.0)).collect();
        assert_eq!(edges, vec![(1000, 1305)]);
        Ok(())
    }

    #[test]
    fn test_strict_boundary() -> Result<(), NetworkError> {
        let table: MassTable = vec![("X", 300.0)].into_iter().collect();
        let features = make_features(&[1000.0, 1300.5]);
        let graph = build_network(&features, &table, 0.5)?;
        assert_eq!(graph.edge_count(), 0);
        let graph = build_network(&features, &table, 0.5000001)?;
        assert_eq!(graph.edge_count(), 1);
        Ok(())
    }

    #[test]
    fn test_last_match_wins() -> Result<(), NetworkError> {
        let features = make_features(&[1000.0, 1300.005]);
        let table: MassTable = vec![("X", 300.0), ("Y", 300.01)].into_iter().collect();
        let builder = NetworkBuilder::new(&table, 0.02)?;
        let (graph, summary) = builder.build_with_summary(&features)?;
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges().next().unwrap().label, "Y");
        assert_eq!(summary.matches, 2);
        assert_eq!(summary.overwritten, 1);

        let table: MassTable = vec![("Y", 300.01), ("X", 300.0)].into_iter().collect();
        let graph = build_network(&features, &table, 0.02)?;
        assert_eq!(graph.edges().next().unwrap().label, "X");
        Ok(())
    }

    #[test]
    fn test_direction_low_to_high() -> Result<(), NetworkError> {
        let table = make_table();
        let features = make_features(&[2000.0, 1694.9587, 2345.05, 1365.9, 2674.1]);
        let graph = build_network(&features, &table, 0.05)?;
        assert!(graph.edge_count() > 0);
        for edge in graph.edges() {
            assert!(edge.source < edge.target, "{edge:?}");
        }
        Ok(())
    }

    #[test]
    fn test_bucket_collision() -> Result<(), NetworkError> {
        let table: MassTable = vec![("C", 305.0413)].into_iter().collect();
        let features = make_features(&[1000.2, 1000.9, 1305.6]);
        let graph = build_network(&features, &table, 0.5)?;
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_node(&NodeKey(1000)));
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<(), NetworkError> {
        let table = MassTable::nucleotides_with_modifications();
        let features = make_features(&[
            1500.0, 1805.04, 2111.07, 2440.12, 2785.17, 1820.05, 2164.11, 2523.17,
        ]);
        let a = build_network(&features, &table, 0.05)?;
        let b = build_network(&features, &table, 0.05)?;
        let a: Vec<_> = a.edges().cloned().collect();
        let b: Vec<_> = b.edges().cloned().collect();
        assert!(!a.is_empty());
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_invalid_inputs() {
        let table = make_table();
        assert!(matches!(
            NetworkBuilder::new(&table, 0.0),
            Err(NetworkError::InvalidTolerance(_))
        ));
        assert!(NetworkBuilder::new(&table, f64::NAN).is_err());
        let features = vec![Feature::new(1000.0, 0.0, 0.0, 1.0)];
        assert!(matches!(
            build_network(&features, &table, 0.02),
            Err(NetworkError::NonPositiveIntensity { .. })
        ));
    }

    #[test]
    fn test_empty() -> Result<(), NetworkError> {
        let graph = build_network::<Feature>(&[], &make_table(), 0.02)?;
        assert!(graph.is_empty());
        Ok(())
    }
}
