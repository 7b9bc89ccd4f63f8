//! kinetica-plot
//!
//! Rendering for TICA projections: free-energy surfaces (visitation
//! histogram → negative log-likelihood → Gaussian-smoothed contours),
//! per-component histograms, pairwise density grids, and the lag-time
//! diagnostic. All output is SVG.
//!
//! The free-energy entry point takes a [`FreeEnergyRequest`] naming the
//! protein, ligand and two axes; an interactive front end drives the same
//! cascade by enumerating `LigandMsm::ligands_for_protein` and
//! `LigandMsm::axis_choices` and submitting one request per selection.
mod filters;
mod histogram;
mod surface;

pub use filters::gaussian_filter;
pub use histogram::{plot_lag_sweep, plot_tica_density, plot_tica_distribution};
pub use surface::{
    plot_free_energy, render_surface, FreeEnergyOptions, FreeEnergyRequest, FreeEnergySurface,
};
