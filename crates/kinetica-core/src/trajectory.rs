//! Multi-model PDB trajectory reading.
//!
//! Ligand-only trajectories are PDB files with one MODEL block per frame and
//! an identical atom ordering in every frame; the topology is a single-frame
//! PDB of the same atoms.
use crate::{Error, Result};
use ndarray::Array2;
use pdbtbx::PDB;
use std::path::Path;

fn open(path: &Path) -> Result<PDB> {
    let filename = path.to_str().ok_or_else(|| Error::Parse {
        path: path.to_path_buf(),
        reason: "non-UTF-8 path".to_string(),
    })?;
    let (pdb, _errors) = pdbtbx::open(filename).map_err(|errors| Error::Parse {
        path: path.to_path_buf(),
        reason: errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    })?;
    Ok(pdb)
}

/// Atom names of a topology file, in file order.
pub fn topology_atom_names(path: &Path) -> Result<Vec<String>> {
    let pdb = open(path)?;
    Ok(pdb.atoms().map(|atom| atom.name().to_string()).collect())
}

/// Number of frames (MODEL blocks) in a trajectory file.
pub fn frame_count(path: &Path) -> Result<usize> {
    Ok(open(path)?.model_count())
}

/// Cartesian coordinates of every atom in every frame, flattened to a
/// (frames × 3·atoms) matrix with x/y/z of atom `a` at columns `3a..3a+3`.
pub fn load_positions(path: &Path) -> Result<Array2<f64>> {
    let pdb = open(path)?;
    let n_frames = pdb.model_count();
    let n_atoms = match pdb.models().next() {
        Some(model) => model.atom_count(),
        None => 0,
    };

    let mut data = Array2::<f64>::zeros((n_frames, n_atoms * 3));
    for (frame, model) in pdb.models().enumerate() {
        if model.atom_count() != n_atoms {
            return Err(Error::Parse {
                path: path.to_path_buf(),
                reason: format!(
                    "model {} has {} atoms, expected {}",
                    frame + 1,
                    model.atom_count(),
                    n_atoms
                ),
            });
        }
        for (a, atom) in model.atoms().enumerate() {
            let (x, y, z) = atom.pos();
            data[[frame, 3 * a]] = x;
            data[[frame, 3 * a + 1]] = y;
            data[[frame, 3 * a + 2]] = z;
        }
    }
    Ok(data)
}
