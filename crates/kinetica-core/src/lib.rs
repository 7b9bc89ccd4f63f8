//! kinetica-core
//!
//! Analysis layer for per-ligand molecular-dynamics trajectories:
//! feature extraction from ligand-only trajectory files, per-frame metric
//! bookkeeping, and TICA (time-lagged independent component analysis)
//! projection into a shared slow-motion subspace.
//!
//! The entry point is [`LigandMsm`], built from an [`AnalysisSource`] that
//! owns the simulation output: ordered (protein, ligand) combinations, the
//! combined per-frame results table, and the trajectory/topology files for
//! each pair. Calls follow the data flow: [`LigandMsm::add_feature`] →
//! [`LigandMsm::collect_features`] → [`LigandMsm::calculate_tica`]; each
//! step returns the typed record it computed and caches it for lookups.
mod error;
mod featurize;
mod msm;
mod source;
mod tica;
mod trajectory;

pub use error::Error;
pub use featurize::{Feature, Featurizer, METRIC_PREFIX};
pub use msm::{Axis, FeatureDataset, LigandMsm, PairKey, TicaProjection};
pub use source::AnalysisSource;
pub use tica::{TicaModel, KINETIC_VARIANCE_CUTOFF};
pub use trajectory::{frame_count, load_positions, topology_atom_names};

pub type Result<T> = std::result::Result<T, Error>;
