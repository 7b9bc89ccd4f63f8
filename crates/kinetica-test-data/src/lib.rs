//! kinetica-test-data
//!
//! Synthetic fixtures for exercising the analysis pipeline without real
//! simulation output: multi-model PDB trajectories written to a temporary
//! directory, plus an in-memory results table with `metric_` columns.
//!
//! [`SyntheticAnalysis`] implements [`AnalysisSource`] and keeps its
//! `TempDir` alive so the trajectory files exist for as long as the fixture
//! does.
use anyhow::Result;
use kinetica_core::AnalysisSource;
use polars::prelude::{df, DataFrame};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ATOMS: [&str; 3] = ["C1", "C2", "O1"];

/// An in-memory analysis source over generated trajectories.
pub struct SyntheticAnalysis {
    combinations: Vec<(String, String)>,
    proteins: Vec<String>,
    results: DataFrame,
    trajectories: BTreeMap<(String, String), Vec<PathBuf>>,
    topologies: BTreeMap<String, PathBuf>,
    frames: usize,
    _dir: TempDir,
}

impl SyntheticAnalysis {
    /// One ligand (`LIG`) shared by proteins `P1` and `P2`, two trajectories
    /// of 100 frames each.
    pub fn two_proteins() -> Result<Self> {
        Self::new(&["P1", "P2"], &["LIG"], 2, 100)
    }

    /// Fully parameterised fixture: every protein is combined with every
    /// ligand, `trajectories_per_pair` files of `frames` frames each.
    pub fn new(
        proteins: &[&str],
        ligands: &[&str],
        trajectories_per_pair: usize,
        frames: usize,
    ) -> Result<Self> {
        Self::build(proteins, ligands, trajectories_per_pair, frames, false)
    }

    /// Like [`Self::two_proteins`], but the results table is missing the
    /// last frame row of the first trajectory, so metric and coordinate
    /// frame counts disagree.
    pub fn two_proteins_with_frame_mismatch() -> Result<Self> {
        Self::build(&["P1", "P2"], &["LIG"], 2, 100, true)
    }

    fn build(
        proteins: &[&str],
        ligands: &[&str],
        trajectories_per_pair: usize,
        frames: usize,
        drop_one_metric_row: bool,
    ) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut combinations = Vec::new();
        let mut trajectories = BTreeMap::new();
        let mut topologies = BTreeMap::new();

        let mut protein_col: Vec<String> = Vec::new();
        let mut ligand_col: Vec<String> = Vec::new();
        let mut trajectory_col: Vec<i64> = Vec::new();
        let mut step_col: Vec<i64> = Vec::new();
        let mut energy_col: Vec<f64> = Vec::new();
        let mut distance_col: Vec<f64> = Vec::new();

        for ligand in ligands {
            let topology = dir.path().join(format!("{ligand}_topology.pdb"));
            fs::write(&topology, pdb_trajectory(1, 7))?;
            topologies.insert(ligand.to_string(), topology);
        }

        let mut seed = 11u64;
        for (p_idx, protein) in proteins.iter().enumerate() {
            for ligand in ligands {
                combinations.push((protein.to_string(), ligand.to_string()));
                let mut paths = Vec::new();
                for t in 0..trajectories_per_pair {
                    seed += 1;
                    let path = dir
                        .path()
                        .join(format!("{protein}_{ligand}_{t}.pdb"));
                    fs::write(&path, pdb_trajectory(frames, seed))?;
                    paths.push(path);

                    let mut rng = StdRng::seed_from_u64(seed ^ 0xfeed);
                    let first_pair = p_idx == 0 && t == 0;
                    let rows = if drop_one_metric_row && first_pair {
                        frames - 1
                    } else {
                        frames
                    };
                    for step in 0..rows {
                        protein_col.push(protein.to_string());
                        ligand_col.push(ligand.to_string());
                        trajectory_col.push(t as i64);
                        step_col.push(step as i64);
                        energy_col.push(
                            -5.0 + 2.0 * (step as f64 * 0.05).cos()
                                + rng.gen_range(-0.1..0.1),
                        );
                        distance_col.push(
                            3.0 + (step as f64 * 0.02).sin() + rng.gen_range(-0.05..0.05),
                        );
                    }
                }
                trajectories.insert((protein.to_string(), ligand.to_string()), paths);
            }
        }

        let results = df!(
            "Protein" => protein_col,
            "Ligand" => ligand_col,
            "Trajectory" => trajectory_col,
            "Step" => step_col,
            "metric_energy" => energy_col,
            "metric_distance" => distance_col,
        )?;

        Ok(Self {
            combinations,
            proteins: proteins.iter().map(|p| p.to_string()).collect(),
            results,
            trajectories,
            topologies,
            frames,
            _dir: dir,
        })
    }

    /// Frame count of every generated trajectory.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn atom_names() -> Vec<String> {
        ATOMS.iter().map(|a| a.to_string()).collect()
    }
}

impl AnalysisSource for SyntheticAnalysis {
    fn combinations(&self) -> &[(String, String)] {
        &self.combinations
    }

    fn proteins(&self) -> &[String] {
        &self.proteins
    }

    fn results(&self) -> &DataFrame {
        &self.results
    }

    fn ligand_trajectories(
        &self,
        protein: &str,
        ligand: &str,
    ) -> kinetica_core::Result<(Vec<PathBuf>, PathBuf)> {
        let paths = self
            .trajectories
            .get(&(protein.to_string(), ligand.to_string()))
            .cloned()
            .ok_or_else(|| kinetica_core::Error::UnknownPair {
                protein: protein.to_string(),
                ligand: ligand.to_string(),
            })?;
        let topology = self
            .topologies
            .get(ligand)
            .cloned()
            .ok_or_else(|| kinetica_core::Error::UnknownLigand(ligand.to_string()))?;
        Ok((paths, topology))
    }
}

/// Multi-model PDB text: one MODEL per frame, a slow cosine drift on x, a
/// slower sine on y, and seeded noise on z so no coordinate is constant.
fn pdb_trajectory(frames: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut body = String::new();
    for frame in 0..frames {
        let _ = writeln!(body, "MODEL     {:>4}", frame + 1);
        for (serial, name) in ATOMS.iter().enumerate() {
            let phase = serial as f64 * 0.7;
            let x = 10.0 + 2.0 * (frame as f64 * 0.05 + phase).cos()
                + rng.gen_range(-0.05..0.05);
            let y = 5.0 + (frame as f64 * 0.01 + phase).sin() + rng.gen_range(-0.05..0.05);
            let z = rng.gen_range(-1.0..1.0);
            let _ = writeln!(
                body,
                "ATOM  {:>5} {:<4} {:>3} {}{:>4}    {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}",
                serial + 1,
                name,
                "LIG",
                "A",
                1,
                x,
                y,
                z,
                1.0,
                0.0,
                &name[..1],
            );
        }
        body.push_str("ENDMDL\n");
    }
    body.push_str("END\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        let analysis = SyntheticAnalysis::two_proteins().unwrap();
        assert_eq!(analysis.combinations().len(), 2);
        assert_eq!(analysis.proteins().len(), 2);
        // 2 proteins × 2 trajectories × 100 frames
        assert_eq!(analysis.results().height(), 400);

        let (paths, topology) = analysis.ligand_trajectories("P1", "LIG").unwrap();
        assert_eq!(paths.len(), 2);
        assert!(topology.exists());
        for path in paths {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_mismatch_fixture_drops_one_row() {
        let analysis = SyntheticAnalysis::two_proteins_with_frame_mismatch().unwrap();
        assert_eq!(analysis.results().height(), 399);
    }

    #[test]
    fn test_trajectory_text_is_deterministic() {
        assert_eq!(pdb_trajectory(5, 42), pdb_trajectory(5, 42));
        assert_ne!(pdb_trajectory(5, 42), pdb_trajectory(5, 43));
    }
}
