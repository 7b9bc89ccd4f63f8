//! End-to-end demo: synthetic trajectories → features → TICA →
//! free-energy surface and diagnostic plots.
//!
//! ```shell
//! cargo run --example free-energy
//! ```
use anyhow::Result;
use kinetica_core::{Axis, LigandMsm};
use kinetica_plot::{
    plot_free_energy, plot_lag_sweep, plot_tica_distribution, FreeEnergyOptions,
    FreeEnergyRequest,
};
use kinetica_test_data::SyntheticAnalysis;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let analysis = SyntheticAnalysis::two_proteins()?;
    let mut msm = LigandMsm::new(&analysis)?;

    msm.add_feature("positions", "LIG")?;
    msm.add_feature("metrics", "LIG")?;
    msm.collect_features("LIG")?;

    let projection = msm.calculate_tica("LIG", 2)?;
    log::info!(
        "TICA retained {} dimensions over {} pooled frames",
        projection.ndims,
        projection.pooled_concatenated.nrows()
    );

    // The selector cascade an interactive front end would drive:
    for protein in msm.proteins().to_vec() {
        for ligand in msm.ligands_for_protein(Some(&protein)) {
            log::info!("available: {protein}/{ligand}");
        }
    }

    let request = FreeEnergyRequest {
        protein: "P1".into(),
        ligand: "LIG".into(),
        x: Axis::Component(1),
        y: Axis::Metric("metric_energy".into()),
    };
    let options = FreeEnergyOptions {
        bins: 60,
        sigma: 1.0,
        y_metric_line: Some(-5.0),
        ..Default::default()
    };
    plot_free_energy(&msm, &request, &options, Path::new("free_energy.svg"))?;
    plot_tica_distribution(&msm, "LIG", 5, Path::new("tica_distribution.svg"))?;

    let sweep = msm.lag_time_sweep("LIG", 5)?;
    plot_lag_sweep(&sweep, Path::new("lag_sweep.svg"))?;

    println!("wrote free_energy.svg, tica_distribution.svg, lag_sweep.svg");
    Ok(())
}
