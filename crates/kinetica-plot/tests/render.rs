//! Rendering tests over the full synthetic pipeline.
use kinetica_core::{Axis, LigandMsm};
use kinetica_plot::{
    plot_free_energy, plot_lag_sweep, plot_tica_density, plot_tica_distribution,
    FreeEnergyOptions, FreeEnergyRequest,
};
use kinetica_test_data::SyntheticAnalysis;
use std::fs;
use std::path::Path;

fn fitted_session(analysis: &SyntheticAnalysis) -> LigandMsm<'_> {
    let mut msm = LigandMsm::new(analysis).unwrap();
    msm.add_feature("positions", "LIG").unwrap();
    msm.add_feature("metrics", "LIG").unwrap();
    msm.collect_features("LIG").unwrap();
    msm.calculate_tica("LIG", 2).unwrap();
    msm
}

fn assert_svg(path: &Path) {
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("<svg"), "{} is not an SVG", path.display());
    assert!(content.len() > 500, "{} looks empty", path.display());
}

#[test]
fn test_free_energy_surface_component_axes() {
    let analysis = SyntheticAnalysis::two_proteins().unwrap();
    let msm = fitted_session(&analysis);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("pes_ic.svg");

    let ndims = msm.tica("LIG").unwrap().ndims;
    let request = FreeEnergyRequest {
        protein: "P1".into(),
        ligand: "LIG".into(),
        x: Axis::Component(1),
        y: if ndims > 1 {
            Axis::Component(2)
        } else {
            Axis::Metric("metric_energy".into())
        },
    };
    let options = FreeEnergyOptions {
        bins: 40,
        ..Default::default()
    };
    plot_free_energy(&msm, &request, &options, &out).unwrap();
    assert_svg(&out);
}

#[test]
fn test_free_energy_surface_metric_axes_with_reference_lines() {
    let analysis = SyntheticAnalysis::two_proteins().unwrap();
    let msm = fitted_session(&analysis);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("pes_metric.svg");

    let request = FreeEnergyRequest {
        protein: "P2".into(),
        ligand: "LIG".into(),
        x: Axis::Metric("metric_distance".into()),
        y: Axis::Metric("metric_energy".into()),
    };
    let options = FreeEnergyOptions {
        bins: 30,
        sigma: 0.8,
        cmax: Some(3.0),
        x_metric_line: Some(3.0),
        y_metric_line: Some(-5.0),
        ..Default::default()
    };
    plot_free_energy(&msm, &request, &options, &out).unwrap();
    assert_svg(&out);
}

#[test]
fn test_free_energy_requires_fitted_tica() {
    let analysis = SyntheticAnalysis::two_proteins().unwrap();
    let msm = LigandMsm::new(&analysis).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let request = FreeEnergyRequest {
        protein: "P1".into(),
        ligand: "LIG".into(),
        x: Axis::Component(1),
        y: Axis::Component(2),
    };
    let result = plot_free_energy(
        &msm,
        &request,
        &FreeEnergyOptions::default(),
        &dir.path().join("never.svg"),
    );
    assert!(result.is_err());
}

#[test]
fn test_distribution_and_density_plots() {
    let analysis = SyntheticAnalysis::two_proteins().unwrap();
    let msm = fitted_session(&analysis);
    let dir = tempfile::tempdir().unwrap();

    let dist = dir.path().join("distribution.svg");
    plot_tica_distribution(&msm, "LIG", 10, &dist).unwrap();
    assert_svg(&dist);

    let ndims = msm.tica("LIG").unwrap().ndims;
    if ndims >= 2 {
        let density = dir.path().join("density.svg");
        plot_tica_density(&msm, "LIG", ndims.min(4), &density).unwrap();
        assert_svg(&density);
    }
}

#[test]
fn test_lag_sweep_plot() {
    let analysis = SyntheticAnalysis::two_proteins().unwrap();
    let mut msm = fitted_session(&analysis);
    let points = msm.lag_time_sweep("LIG", 3).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("lag_sweep.svg");
    plot_lag_sweep(&points, &out).unwrap();
    assert_svg(&out);
}
