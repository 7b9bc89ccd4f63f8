use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while assembling features or fitting TICA models.
#[derive(Debug, Error)]
pub enum Error {
    #[error("feature '{0}' not implemented; try one of: positions, metrics")]
    UnsupportedFeature(String),

    #[error("axis '{0}' is neither an IC index (e.g. 'IC2') nor a metric column")]
    UnsupportedAxis(String),

    #[error("no featurizer registered for ligand '{0}'")]
    UnknownLigand(String),

    #[error("no trajectories recorded for protein '{protein}' with ligand '{ligand}'")]
    UnknownPair { protein: String, ligand: String },

    #[error("no feature data collected for ligand '{0}'; run collect_features first")]
    MissingFeatureData(String),

    #[error("no TICA model fitted for ligand '{0}'; run calculate_tica first")]
    MissingTica(String),

    #[error(
        "metric rows ({metric_frames}) do not match trajectory frames ({coord_frames}) \
         for protein '{protein}', ligand '{ligand}', trajectory {trajectory}"
    )]
    FrameCountMismatch {
        protein: String,
        ligand: String,
        trajectory: usize,
        coord_frames: usize,
        metric_frames: usize,
    },

    #[error(
        "{actual} trajectory files but {expected} metric tables for \
         protein '{protein}', ligand '{ligand}'"
    )]
    TrajectoryCountMismatch {
        protein: String,
        ligand: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{0}' not found in the results table")]
    MissingColumn(String),

    #[error("lag time must be at least 1")]
    InvalidLag,

    #[error("lag time {lag} leaves no usable frame pairs in any trajectory")]
    LagTooLarge { lag: usize },

    #[error("cannot fit TICA on an empty feature set")]
    EmptyFeatureSet,

    #[error("instantaneous covariance has no positive spectrum")]
    DegenerateCovariance,

    #[error("failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
