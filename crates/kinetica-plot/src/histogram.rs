//! Component histograms, pairwise density grids, and the lag-time sweep.
use anyhow::{ensure, Result};
use itertools::Itertools;
use kinetica_core::LigandMsm;
use ndarray::ArrayView1;
use plotters::prelude::*;
use std::path::Path;

const DENSITY_BINS: usize = 80;
const DISTRIBUTION_BINS: usize = 60;

/// Histograms of the first `max_tica` pooled TICA components, one panel per
/// component, counts on a log scale. Fails if `calculate_tica` has not run
/// for the ligand.
pub fn plot_tica_distribution(
    msm: &LigandMsm,
    ligand: &str,
    max_tica: usize,
    path: &Path,
) -> Result<()> {
    let projection = msm.tica(ligand)?;
    let data = &projection.pooled_concatenated;
    let panels = max_tica.min(data.ncols());
    ensure!(panels > 0, "no TICA components available to histogram");

    let root = SVGBackend::new(path, (680, 150 * panels as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((panels, 1));

    for (i, area) in areas.iter().enumerate() {
        let column = data.column(i);
        let (counts, edges) = histogram1d(column, DISTRIBUTION_BINS);
        let max_count = counts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let mut chart = ChartBuilder::on(area)
            .margin(8)
            .x_label_area_size(24)
            .y_label_area_size(48)
            .build_cartesian_2d(
                edges[0]..edges[edges.len() - 1],
                (0.8..max_count * 1.5).log_scale(),
            )?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .y_desc(format!("IC{}", i + 1))
            .draw()?;
        chart.draw_series(counts.iter().enumerate().filter(|(_, &c)| c > 0.0).map(
            |(b, &count)| {
                Rectangle::new(
                    [(edges[b], 0.8), (edges[b + 1], count)],
                    BLUE.mix(0.6).filled(),
                )
            },
        ))?;
    }
    root.present()?;
    Ok(())
}

/// Pairwise 2-D density plots for all unordered pairs among the first
/// `ndims` pooled components, stacked vertically, log-scaled color.
pub fn plot_tica_density(
    msm: &LigandMsm,
    ligand: &str,
    ndims: usize,
    path: &Path,
) -> Result<()> {
    let projection = msm.tica(ligand)?;
    let data = &projection.pooled_concatenated;
    let ndims = ndims.min(data.ncols());
    let pairs: Vec<(usize, usize)> = (0..ndims).tuple_combinations().collect();
    ensure!(!pairs.is_empty(), "need at least two TICA components for density plots");

    let root = SVGBackend::new(path, (520, 420 * pairs.len() as u32)).into_drawing_area();
    root.fill(&WHITE)?;
    let areas = root.split_evenly((pairs.len(), 1));

    for (area, &(a, b)) in areas.iter().zip(&pairs) {
        let xs = data.column(a);
        let ys = data.column(b);
        let (counts, x_edges, y_edges) = histogram2d_views(xs, ys, DENSITY_BINS);
        let max_count = counts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let scale = (1.0 + max_count).ln();

        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(44)
            .build_cartesian_2d(
                x_edges[0]..x_edges[x_edges.len() - 1],
                y_edges[0]..y_edges[y_edges.len() - 1],
            )?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc(format!("IC {}", a + 1))
            .y_desc(format!("IC {}", b + 1))
            .draw()?;

        let mut cells = Vec::new();
        for i in 0..DENSITY_BINS {
            for j in 0..DENSITY_BINS {
                let count = counts[i * DENSITY_BINS + j];
                if count <= 0.0 {
                    continue;
                }
                let fraction = if scale > 0.0 {
                    (1.0 + count).ln() / scale
                } else {
                    0.0
                };
                cells.push(Rectangle::new(
                    [(x_edges[i], y_edges[j]), (x_edges[i + 1], y_edges[j + 1])],
                    density_color(fraction).filled(),
                ));
            }
        }
        chart.draw_series(cells)?;
    }
    root.present()?;
    Ok(())
}

/// Line plot of retained dimensionality against lag time, from the points
/// `LigandMsm::lag_time_sweep` returns.
pub fn plot_lag_sweep(points: &[(usize, usize)], path: &Path) -> Result<()> {
    ensure!(!points.is_empty(), "lag sweep produced no points");
    let max_lag = points[points.len() - 1].0 as f64;
    let max_dim = points
        .iter()
        .map(|&(_, d)| d)
        .max()
        .unwrap_or(1) as f64;

    let root = SVGBackend::new(path, (420, 260)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(36)
        .build_cartesian_2d(1.0..max_lag.max(1.0 + f64::EPSILON), 0.0..max_dim + 1.0)?;
    chart
        .configure_mesh()
        .x_desc("Lag time [ns]")
        .y_desc("Dims holding 95% kinetic variance")
        .draw()?;
    chart.draw_series(LineSeries::new(
        points.iter().map(|&(lag, dims)| (lag as f64, dims as f64)),
        BLUE.stroke_width(2),
    ))?;
    root.present()?;
    Ok(())
}

fn histogram1d(values: ArrayView1<f64>, bins: usize) -> (Vec<f64>, Vec<f64>) {
    let min = values.fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let (min, max) = if max > min {
        (min, max)
    } else {
        (min - 0.5, min + 0.5)
    };
    let edges: Vec<f64> = (0..=bins)
        .map(|i| min + (max - min) * i as f64 / bins as f64)
        .collect();
    let mut counts = vec![0.0; bins];
    for &v in values.iter() {
        let i = (((v - min) / (max - min) * bins as f64) as usize).min(bins - 1);
        counts[i] += 1.0;
    }
    (counts, edges)
}

/// Row-major (x_bin · bins + y_bin) counts with the two edge vectors.
fn histogram2d_views(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    bins: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let (_, x_edges) = histogram1d(x, bins);
    let (_, y_edges) = histogram1d(y, bins);

    let x_min = x_edges[0];
    let x_max = x_edges[bins];
    let y_min = y_edges[0];
    let y_max = y_edges[bins];
    let mut counts = vec![0.0; bins * bins];
    for (&xv, &yv) in x.iter().zip(y.iter()) {
        let i = (((xv - x_min) / (x_max - x_min) * bins as f64) as usize).min(bins - 1);
        let j = (((yv - y_min) / (y_max - y_min) * bins as f64) as usize).min(bins - 1);
        counts[i * bins + j] += 1.0;
    }
    (counts, x_edges, y_edges)
}

/// Light-to-dark blue ramp for density cells.
fn density_color(fraction: f64) -> RGBColor {
    let t = fraction.clamp(0.0, 1.0);
    let r = (235.0 - 205.0 * t) as u8;
    let g = (240.0 - 170.0 * t) as u8;
    let b = 250.0 as u8;
    RGBColor(r, g, b)
}
