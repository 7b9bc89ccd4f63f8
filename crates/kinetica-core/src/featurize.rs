//! Feature specification for converting trajectory frames into vectors.
use crate::{trajectory, Error, Result};
use ndarray::Array2;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Column-name prefix marking per-frame scalar metrics in the results table.
pub const METRIC_PREFIX: &str = "metric_";

/// A feature type that can be registered on a ligand's [`Featurizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Cartesian coordinates of every ligand atom.
    Positions,
    /// Per-frame scalar columns from the results table.
    Metrics,
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positions" => Ok(Feature::Positions),
            "metrics" => Ok(Feature::Metrics),
            other => Err(Error::UnsupportedFeature(other.to_string())),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Positions => write!(f, "positions"),
            Feature::Metrics => write!(f, "metrics"),
        }
    }
}

/// Converts raw trajectory files into per-frame feature vectors.
///
/// Bound to one ligand's topology; created empty and populated through
/// [`Featurizer::add`]. Coordinate-derived columns come from the trajectory
/// files themselves; metric columns are appended later by the session from
/// the results table.
#[derive(Debug, Clone)]
pub struct Featurizer {
    topology: PathBuf,
    atom_names: Vec<String>,
    features: Vec<Feature>,
}

impl Featurizer {
    /// Reads the topology to enumerate the ligand's atoms; no features are
    /// registered yet.
    pub fn new(topology: &Path) -> Result<Self> {
        let atom_names = trajectory::topology_atom_names(topology)?;
        Ok(Self {
            topology: topology.to_path_buf(),
            atom_names,
            features: Vec::new(),
        })
    }

    pub fn topology(&self) -> &Path {
        &self.topology
    }

    pub fn atom_names(&self) -> &[String] {
        &self.atom_names
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Registers a feature type. Adding the same type twice is a no-op.
    pub fn add(&mut self, feature: Feature) {
        if !self.has(feature) {
            self.features.push(feature);
        }
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Width of the coordinate-derived part of the feature vector.
    pub fn dimension(&self) -> usize {
        if self.has(Feature::Positions) {
            self.atom_names.len() * 3
        } else {
            0
        }
    }

    /// Loads one trajectory into a (frames × dimension) matrix.
    ///
    /// Without a registered `positions` feature this still reads the file so
    /// the frame count is known, returning a zero-width matrix for the
    /// session to widen with metric columns.
    pub fn load(&self, trajectory_file: &Path) -> Result<Array2<f64>> {
        if self.has(Feature::Positions) {
            trajectory::load_positions(trajectory_file)
        } else {
            let frames = trajectory::frame_count(trajectory_file)?;
            Ok(Array2::zeros((frames, 0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_parse_round_trip() {
        assert_eq!("positions".parse::<Feature>().unwrap(), Feature::Positions);
        assert_eq!("metrics".parse::<Feature>().unwrap(), Feature::Metrics);
    }

    #[test]
    fn test_unsupported_feature_names_accepted_set() {
        let err = "velocities".parse::<Feature>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("velocities"));
        assert!(message.contains("positions"));
        assert!(message.contains("metrics"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut featurizer = Featurizer {
            topology: PathBuf::from("top.pdb"),
            atom_names: vec!["C1".into(), "O1".into()],
            features: Vec::new(),
        };
        assert_eq!(featurizer.dimension(), 0);
        featurizer.add(Feature::Positions);
        featurizer.add(Feature::Positions);
        assert_eq!(featurizer.features().len(), 1);
        assert_eq!(featurizer.dimension(), 6);
    }
}
