//! Per-ligand analysis session: trajectory bookkeeping, feature assembly,
//! and TICA projection, keyed by (protein, ligand).
use crate::featurize::{Feature, Featurizer, METRIC_PREFIX};
use crate::source::AnalysisSource;
use crate::tica::TicaModel;
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use polars::prelude::{col, lit, DataFrame, IntoLazy};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Composite identifier for one protein simulated with one ligand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub protein: String,
    pub ligand: String,
}

impl PairKey {
    pub fn new(protein: &str, ligand: &str) -> Self {
        Self {
            protein: protein.to_string(),
            ligand: ligand.to_string(),
        }
    }
}

/// One plotting coordinate: a TICA component (1-based, as labelled `IC1`,
/// `IC2`, …) or a metric column from the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Axis {
    Component(usize),
    Metric(String),
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Component(n) => write!(f, "IC{n}"),
            Axis::Metric(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(index) = s.strip_prefix("IC") {
            if let Ok(n) = index.parse::<usize>() {
                if n >= 1 {
                    return Ok(Axis::Component(n));
                }
            }
        }
        if s.starts_with(METRIC_PREFIX) {
            return Ok(Axis::Metric(s.to_string()));
        }
        Err(Error::UnsupportedAxis(s.to_string()))
    }
}

/// Feature arrays collected for one ligand: per protein in trajectory order,
/// plus the ligand-wide pool the TICA fit consumes.
#[derive(Debug, Clone, Default)]
pub struct FeatureDataset {
    pub per_protein: BTreeMap<String, Vec<Array2<f64>>>,
    pub pooled: Vec<Array2<f64>>,
}

/// A fitted TICA model together with every projection derived from it.
///
/// Replaced wholesale when [`LigandMsm::calculate_tica`] runs again for the
/// same ligand, so `ndims` always reflects the most recent fit.
#[derive(Debug, Clone)]
pub struct TicaProjection {
    pub model: TicaModel,
    /// Output per pooled trajectory, in pooling order.
    pub pooled_output: Vec<Array2<f64>>,
    /// Row-wise concatenation of `pooled_output`.
    pub pooled_concatenated: Array2<f64>,
    /// Per-protein outputs, one matrix per trajectory.
    pub per_protein_output: BTreeMap<String, Vec<Array2<f64>>>,
    /// Per-protein row-wise concatenations.
    pub concatenated: BTreeMap<String, Array2<f64>>,
    /// Retained dimensionality of the fit.
    pub ndims: usize,
}

/// Analysis session over an [`AnalysisSource`].
///
/// Construction walks every (protein, ligand) combination, records its
/// trajectory files, and builds one empty [`Featurizer`] per ligand from
/// that ligand's topology. Later steps populate per-ligand state:
/// [`add_feature`](Self::add_feature) registers what to extract,
/// [`collect_features`](Self::collect_features) reads the trajectories, and
/// [`calculate_tica`](Self::calculate_tica) fits and projects. Re-running a
/// step overwrites its cached result for that ligand.
pub struct LigandMsm<'a> {
    source: &'a dyn AnalysisSource,
    trajectories: BTreeMap<PairKey, Vec<PathBuf>>,
    all_trajectories: Vec<PathBuf>,
    topologies: BTreeMap<String, PathBuf>,
    ligand_atoms: BTreeMap<String, Vec<String>>,
    featurizers: BTreeMap<String, Featurizer>,
    metric_features: BTreeMap<String, BTreeMap<String, Vec<Array2<f64>>>>,
    datasets: BTreeMap<String, FeatureDataset>,
    tica: BTreeMap<String, TicaProjection>,
}

impl<'a> LigandMsm<'a> {
    /// Gathers ligand-only trajectories and topologies for every
    /// combination. Any retrieval or parse failure is fatal here.
    pub fn new(source: &'a dyn AnalysisSource) -> Result<Self> {
        let mut msm = Self {
            source,
            trajectories: BTreeMap::new(),
            all_trajectories: Vec::new(),
            topologies: BTreeMap::new(),
            ligand_atoms: BTreeMap::new(),
            featurizers: BTreeMap::new(),
            metric_features: BTreeMap::new(),
            datasets: BTreeMap::new(),
            tica: BTreeMap::new(),
        };

        log::info!("collecting ligand-only trajectories");
        for (protein, ligand) in source.combinations() {
            let (paths, topology) = source.ligand_trajectories(protein, ligand)?;
            log::debug!("{protein}/{ligand}: {} trajectory files", paths.len());
            msm.all_trajectories.extend(paths.iter().cloned());
            msm.trajectories.insert(PairKey::new(protein, ligand), paths);

            if !msm.featurizers.contains_key(ligand.as_str()) {
                let featurizer = Featurizer::new(&topology)?;
                msm.ligand_atoms
                    .insert(ligand.clone(), featurizer.atom_names().to_vec());
                msm.topologies.insert(ligand.clone(), topology);
                msm.featurizers.insert(ligand.clone(), featurizer);
            }
        }
        Ok(msm)
    }

    /// Registers a feature type (`"positions"` or `"metrics"`) on a ligand.
    ///
    /// `"metrics"` also slices the results table into per-protein,
    /// per-trajectory matrices so frame alignment can be checked when the
    /// features are collected.
    pub fn add_feature(&mut self, feature: &str, ligand: &str) -> Result<()> {
        let feature: Feature = feature.parse()?;
        match feature {
            Feature::Positions => {
                let featurizer = self
                    .featurizers
                    .get_mut(ligand)
                    .ok_or_else(|| Error::UnknownLigand(ligand.to_string()))?;
                featurizer.add(Feature::Positions);
            }
            Feature::Metrics => {
                if !self.featurizers.contains_key(ligand) {
                    return Err(Error::UnknownLigand(ligand.to_string()));
                }
                let metrics = self.metric_columns();
                let ligand_frame = self.ligand_frame(ligand)?;
                let ids = trajectory_ids(&ligand_frame)?;
                let mut per_protein = BTreeMap::new();
                for protein in self.source.proteins() {
                    let protein_frame = filter_eq_str(&ligand_frame, "Protein", protein)?;
                    let mut arrays = Vec::with_capacity(ids.len());
                    for &id in &ids {
                        let frame = filter_eq_i64(&protein_frame, "Trajectory", id)?;
                        arrays.push(metric_matrix(&frame, &metrics)?);
                    }
                    per_protein.insert(protein.clone(), arrays);
                }
                self.metric_features.insert(ligand.to_string(), per_protein);
            }
        }
        Ok(())
    }

    /// Loads feature arrays for every protein sharing the ligand and pools
    /// them for TICA fitting. Metric columns, if registered, are appended to
    /// each trajectory's coordinate columns after checking that both sides
    /// agree on the frame count.
    pub fn collect_features(&mut self, ligand: &str) -> Result<&FeatureDataset> {
        let featurizer = self
            .featurizers
            .get(ligand)
            .ok_or_else(|| Error::UnknownLigand(ligand.to_string()))?;

        let mut dataset = FeatureDataset::default();
        for protein in self.source.proteins() {
            let key = PairKey::new(protein, ligand);
            let paths = self.trajectories.get(&key).ok_or_else(|| Error::UnknownPair {
                protein: protein.clone(),
                ligand: ligand.to_string(),
            })?;

            log::debug!("loading features for {protein}/{ligand}");
            let mut arrays = paths
                .iter()
                .map(|path| featurizer.load(path))
                .collect::<Result<Vec<_>>>()?;

            if let Some(metric_features) = self.metric_features.get(ligand) {
                let per_trajectory = metric_features.get(protein).ok_or_else(|| {
                    Error::UnknownPair {
                        protein: protein.clone(),
                        ligand: ligand.to_string(),
                    }
                })?;
                if per_trajectory.len() != arrays.len() {
                    return Err(Error::TrajectoryCountMismatch {
                        protein: protein.clone(),
                        ligand: ligand.to_string(),
                        expected: per_trajectory.len(),
                        actual: arrays.len(),
                    });
                }
                for (t, (coords, metrics)) in
                    arrays.iter_mut().zip(per_trajectory).enumerate()
                {
                    if coords.nrows() != metrics.nrows() {
                        return Err(Error::FrameCountMismatch {
                            protein: protein.clone(),
                            ligand: ligand.to_string(),
                            trajectory: t,
                            coord_frames: coords.nrows(),
                            metric_frames: metrics.nrows(),
                        });
                    }
                    *coords = ndarray::concatenate(
                        ndarray::Axis(1),
                        &[coords.view(), metrics.view()],
                    )?;
                }
            }

            dataset.pooled.extend(arrays.iter().cloned());
            dataset.per_protein.insert(protein.clone(), arrays);
        }

        self.datasets.insert(ligand.to_string(), dataset);
        self.dataset(ligand)
    }

    /// Fits one TICA model on the ligand's pooled features at `lag` and
    /// projects every protein's trajectories through it. A repeated call
    /// replaces all stored results for the ligand.
    pub fn calculate_tica(&mut self, ligand: &str, lag: usize) -> Result<&TicaProjection> {
        let dataset = self
            .datasets
            .get(ligand)
            .ok_or_else(|| Error::MissingFeatureData(ligand.to_string()))?;

        log::info!("fitting TICA for ligand '{ligand}' at lag {lag}");
        let model = TicaModel::fit(&dataset.pooled, lag)?;
        let ndims = model.ndims();
        log::debug!("retained {ndims} dimensions");

        let pooled_output: Vec<Array2<f64>> =
            dataset.pooled.iter().map(|x| model.transform(x)).collect();
        let pooled_concatenated = vstack(&pooled_output)?;

        let mut per_protein_output = BTreeMap::new();
        let mut concatenated = BTreeMap::new();
        for (protein, arrays) in &dataset.per_protein {
            let output: Vec<Array2<f64>> =
                arrays.iter().map(|x| model.transform(x)).collect();
            concatenated.insert(protein.clone(), vstack(&output)?);
            per_protein_output.insert(protein.clone(), output);
        }

        let projection = TicaProjection {
            model,
            pooled_output,
            pooled_concatenated,
            per_protein_output,
            concatenated,
            ndims,
        };
        self.tica.insert(ligand.to_string(), projection);
        self.tica(ligand)
    }

    /// Refits TICA at every lag in `1..=max_lag`, returning the retained
    /// dimensionality per lag. Each step repeats the full fit; the last
    /// fit is left in place as the ligand's current projection.
    pub fn lag_time_sweep(
        &mut self,
        ligand: &str,
        max_lag: usize,
    ) -> Result<Vec<(usize, usize)>> {
        let mut points = Vec::with_capacity(max_lag);
        for lag in 1..=max_lag {
            let ndims = self.calculate_tica(ligand, lag)?.ndims;
            points.push((lag, ndims));
        }
        Ok(points)
    }

    /// Per-trajectory values of one metric column for a (ligand, protein)
    /// pair, in trajectory-id order. Pure read of the results table.
    pub fn metric_data(
        &self,
        ligand: &str,
        protein: &str,
        metric: &str,
    ) -> Result<Vec<Array1<f64>>> {
        let ligand_frame = self.ligand_frame(ligand)?;
        let protein_frame = filter_eq_str(&ligand_frame, "Protein", protein)?;
        let mut data = Vec::new();
        for id in trajectory_ids(&ligand_frame)? {
            let frame = filter_eq_i64(&protein_frame, "Trajectory", id)?;
            let values: Vec<f64> = frame
                .column(metric)
                .map_err(|_| Error::MissingColumn(metric.to_string()))?
                .f64()?
                .into_no_null_iter()
                .collect();
            data.push(Array1::from(values));
        }
        Ok(data)
    }

    /// Concatenated values for one plotting axis of a (ligand, protein)
    /// pair: a column of the protein's concatenated TICA projection, or a
    /// metric column joined across trajectories.
    pub fn coordinate(&self, ligand: &str, protein: &str, axis: &Axis) -> Result<Array1<f64>> {
        match axis {
            Axis::Component(n) => {
                let projection = self.tica(ligand)?;
                let concatenated =
                    projection
                        .concatenated
                        .get(protein)
                        .ok_or_else(|| Error::UnknownPair {
                            protein: protein.to_string(),
                            ligand: ligand.to_string(),
                        })?;
                if *n == 0 || *n > concatenated.ncols() {
                    return Err(Error::UnsupportedAxis(axis.to_string()));
                }
                Ok(concatenated.column(n - 1).to_owned())
            }
            Axis::Metric(name) => {
                let arrays = self.metric_data(ligand, protein, name)?;
                let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
                Ok(ndarray::concatenate(ndarray::Axis(0), &views)?)
            }
        }
    }

    /// Axis choices offered for free-energy plotting: every metric column,
    /// then components `IC1..=ICmax_tica`.
    pub fn axis_choices(&self, max_tica: usize) -> Vec<Axis> {
        let mut choices: Vec<Axis> =
            self.metric_columns().into_iter().map(Axis::Metric).collect();
        choices.extend((1..=max_tica).map(Axis::Component));
        choices
    }

    /// Ligands available for one protein, or for all proteins (deduplicated,
    /// first-seen order) when `protein` is `None`.
    pub fn ligands_for_protein(&self, protein: Option<&str>) -> Vec<String> {
        let mut ligands = Vec::new();
        for (p, ligand) in self.source.combinations() {
            let selected = match protein {
                Some(name) => p == name,
                None => true,
            };
            if selected && !ligands.contains(ligand) {
                ligands.push(ligand.clone());
            }
        }
        ligands
    }

    /// Metric column names in the results table, in table order.
    pub fn metric_columns(&self) -> Vec<String> {
        self.source
            .results()
            .get_column_names()
            .iter()
            .filter(|name| name.starts_with(METRIC_PREFIX))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn proteins(&self) -> &[String] {
        self.source.proteins()
    }

    pub fn combinations(&self) -> &[(String, String)] {
        self.source.combinations()
    }

    pub fn trajectories(&self, protein: &str, ligand: &str) -> Result<&[PathBuf]> {
        self.trajectories
            .get(&PairKey::new(protein, ligand))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownPair {
                protein: protein.to_string(),
                ligand: ligand.to_string(),
            })
    }

    /// Every trajectory file across all combinations, in combination order.
    pub fn all_trajectories(&self) -> &[PathBuf] {
        &self.all_trajectories
    }

    pub fn topology(&self, ligand: &str) -> Result<&Path> {
        self.topologies
            .get(ligand)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::UnknownLigand(ligand.to_string()))
    }

    /// Atom names of the ligand, read from its topology at construction.
    pub fn ligand_atoms(&self, ligand: &str) -> Result<&[String]> {
        self.ligand_atoms
            .get(ligand)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownLigand(ligand.to_string()))
    }

    pub fn featurizer(&self, ligand: &str) -> Result<&Featurizer> {
        self.featurizers
            .get(ligand)
            .ok_or_else(|| Error::UnknownLigand(ligand.to_string()))
    }

    /// Collected features for a ligand, if `collect_features` has run.
    pub fn dataset(&self, ligand: &str) -> Result<&FeatureDataset> {
        self.datasets
            .get(ligand)
            .ok_or_else(|| Error::MissingFeatureData(ligand.to_string()))
    }

    /// Fitted projection for a ligand, if `calculate_tica` has run.
    pub fn tica(&self, ligand: &str) -> Result<&TicaProjection> {
        self.tica
            .get(ligand)
            .ok_or_else(|| Error::MissingTica(ligand.to_string()))
    }

    fn ligand_frame(&self, ligand: &str) -> Result<DataFrame> {
        filter_eq_str(self.source.results(), "Ligand", ligand)
    }
}

fn filter_eq_str(frame: &DataFrame, column: &str, value: &str) -> Result<DataFrame> {
    Ok(frame
        .clone()
        .lazy()
        .filter(col(column).eq(lit(value)))
        .collect()?)
}

fn filter_eq_i64(frame: &DataFrame, column: &str, value: i64) -> Result<DataFrame> {
    Ok(frame
        .clone()
        .lazy()
        .filter(col(column).eq(lit(value)))
        .collect()?)
}

/// Sorted unique trajectory identifiers present in a table slice.
fn trajectory_ids(frame: &DataFrame) -> Result<Vec<i64>> {
    let ids: BTreeSet<i64> = frame
        .column("Trajectory")?
        .i64()?
        .into_no_null_iter()
        .collect();
    Ok(ids.into_iter().collect())
}

/// (rows × metrics) matrix of the given metric columns of a table slice.
fn metric_matrix(frame: &DataFrame, metrics: &[String]) -> Result<Array2<f64>> {
    let mut data = Array2::<f64>::zeros((frame.height(), metrics.len()));
    for (j, name) in metrics.iter().enumerate() {
        let column = frame.column(name.as_str())?.f64()?;
        for (i, value) in column.into_no_null_iter().enumerate() {
            data[[i, j]] = value;
        }
    }
    Ok(data)
}

fn vstack(arrays: &[Array2<f64>]) -> Result<Array2<f64>> {
    let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
    Ok(ndarray::concatenate(ndarray::Axis(0), &views)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_labels_round_trip() {
        assert_eq!("IC3".parse::<Axis>().unwrap(), Axis::Component(3));
        assert_eq!(Axis::Component(3).to_string(), "IC3");
        assert_eq!(
            "metric_energy".parse::<Axis>().unwrap(),
            Axis::Metric("metric_energy".to_string())
        );
    }

    #[test]
    fn test_axis_rejects_unknown_labels() {
        assert!("IC0".parse::<Axis>().is_err());
        assert!("distance".parse::<Axis>().is_err());
        assert!("ICx".parse::<Axis>().is_err());
    }

    #[test]
    fn test_pair_key_ordering() {
        let a = PairKey::new("P1", "LIG");
        let b = PairKey::new("P2", "LIG");
        assert!(a < b);
        assert_eq!(a, PairKey::new("P1", "LIG"));
    }
}
