use crate::Result;
use polars::prelude::DataFrame;
use std::path::PathBuf;

/// Seam to the surrounding analysis system that owns the simulation output.
///
/// Implementations hold the combined per-frame results table and know where
/// the ligand-only trajectory files live. [`crate::LigandMsm`] reads
/// everything through this trait and never touches simulation storage
/// directly.
pub trait AnalysisSource {
    /// Ordered (protein, ligand) combinations with simulation data.
    fn combinations(&self) -> &[(String, String)];

    /// Protein names covered by the combinations.
    fn proteins(&self) -> &[String];

    /// Combined results table, one row per frame, carrying `Protein`,
    /// `Ligand` and `Trajectory` index columns. Per-frame scalar metrics are
    /// columns prefixed with [`crate::METRIC_PREFIX`].
    fn results(&self) -> &DataFrame;

    /// Ligand-only trajectory files for one (protein, ligand) pair, plus the
    /// topology file shared by every trajectory of that ligand.
    fn ligand_trajectories(&self, protein: &str, ligand: &str)
        -> Result<(Vec<PathBuf>, PathBuf)>;
}
