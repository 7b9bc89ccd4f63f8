//! Free-energy surface computation and rendering.
//!
//! The transform follows the usual Boltzmann inversion of a visitation
//! histogram: bin the two coordinates, add a pseudo-count so empty bins stay
//! finite, take the negative natural log, scale to kcal/mol, shift the
//! minimum to zero and smooth with a Gaussian before contouring.
use crate::filters::gaussian_filter;
use anyhow::{ensure, Result};
use kinetica_core::{Axis, LigandMsm};
use ndarray::{Array1, Array2};
use plotters::prelude::*;
use std::path::Path;

/// RT at room temperature, kcal/mol.
const ENERGY_SCALE: f64 = 0.592;
/// Added to every bin count before the log to avoid -ln(0).
const PSEUDO_COUNT: f64 = 0.1;
const CONTOUR_LEVELS: usize = 9;

/// One fully specified surface: the protein, the ligand available for it,
/// and the two plotting axes. This is the request an interactive selector
/// cascade produces.
#[derive(Debug, Clone)]
pub struct FreeEnergyRequest {
    pub protein: String,
    pub ligand: String,
    pub x: Axis,
    pub y: Axis,
}

/// Binning, smoothing and cosmetic knobs for the surface.
#[derive(Debug, Clone)]
pub struct FreeEnergyOptions {
    pub bins: usize,
    pub sigma: f64,
    /// Figure scale factor.
    pub size: f64,
    /// Cap for the contour level range; defaults to (max − 0.5).
    pub cmax: Option<f64>,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    /// Dashed vertical reference line at a fixed metric value.
    pub x_metric_line: Option<f64>,
    /// Dashed horizontal reference line at a fixed metric value.
    pub y_metric_line: Option<f64>,
}

impl Default for FreeEnergyOptions {
    fn default() -> Self {
        Self {
            bins: 100,
            sigma: 1.0,
            size: 1.0,
            cmax: None,
            xlim: None,
            ylim: None,
            x_metric_line: None,
            y_metric_line: None,
        }
    }
}

/// A computed surface: energies in kcal/mol on a bins × bins grid indexed
/// `[x_bin, y_bin]`, with the bin edges and contour levels used to draw it.
#[derive(Debug, Clone)]
pub struct FreeEnergySurface {
    pub grid: Array2<f64>,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    pub levels: Vec<f64>,
}

impl FreeEnergySurface {
    pub fn compute(
        x: &Array1<f64>,
        y: &Array1<f64>,
        options: &FreeEnergyOptions,
    ) -> Result<Self> {
        ensure!(
            x.len() == y.len(),
            "coordinate arrays differ in length: {} vs {}",
            x.len(),
            y.len()
        );
        ensure!(!x.is_empty(), "cannot histogram empty coordinate arrays");
        ensure!(options.bins > 0, "bin count must be positive");

        let (mut counts, x_edges, y_edges) = histogram2d(x, y, options.bins);
        counts += PSEUDO_COUNT;
        let energy = counts.mapv(|z| -z.ln());
        let min = energy.fold(f64::INFINITY, |a, &b| a.min(b));
        let shifted = energy.mapv(|f| (f - min) * ENERGY_SCALE);
        let grid = gaussian_filter(&shifted, options.sigma);
        let levels = contour_levels(&grid, options.cmax);

        Ok(Self {
            grid,
            x_edges,
            y_edges,
            levels,
        })
    }

    pub fn max(&self) -> f64 {
        self.grid.fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    }

    fn x_range(&self) -> (f64, f64) {
        (self.x_edges[0], self.x_edges[self.x_edges.len() - 1])
    }

    fn y_range(&self) -> (f64, f64) {
        (self.y_edges[0], self.y_edges[self.y_edges.len() - 1])
    }
}

/// Resolves the request against the session and renders the surface to an
/// SVG file. Requires `calculate_tica` to have run for the ligand when a
/// TICA component axis is requested.
pub fn plot_free_energy(
    msm: &LigandMsm,
    request: &FreeEnergyRequest,
    options: &FreeEnergyOptions,
    path: &Path,
) -> Result<()> {
    log::debug!(
        "free-energy surface for {}/{}: {} vs {}",
        request.protein,
        request.ligand,
        request.x,
        request.y
    );
    let x = msm.coordinate(&request.ligand, &request.protein, &request.x)?;
    let y = msm.coordinate(&request.ligand, &request.protein, &request.y)?;
    let surface = FreeEnergySurface::compute(&x, &y, options)?;
    render_surface(
        &surface,
        &request.x.to_string(),
        &request.y.to_string(),
        options,
        path,
    )
}

/// Draws a computed surface: filled contour cells, contour lines, optional
/// metric reference lines and a colorbar.
pub fn render_surface(
    surface: &FreeEnergySurface,
    xlabel: &str,
    ylabel: &str,
    options: &FreeEnergyOptions,
    path: &Path,
) -> Result<()> {
    let width = (640.0 * options.size) as u32;
    let height = (520.0 * options.size) as u32;
    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let (plot_area, bar_area) = root.split_horizontally((width as f32 * 0.86) as i32);

    let (x_min, x_max) = options.xlim.unwrap_or_else(|| surface.x_range());
    let (y_min, y_max) = options.ylim.unwrap_or_else(|| surface.y_range());

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(44)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(xlabel)
        .y_desc(ylabel)
        .draw()?;

    let top = surface.levels[surface.levels.len() - 1];
    let nx = surface.grid.nrows();
    let ny = surface.grid.ncols();

    // Filled cells; values above the highest level stay unpainted, as in a
    // capped contourf.
    let mut cells = Vec::new();
    for i in 0..nx {
        for j in 0..ny {
            let value = surface.grid[[i, j]];
            if top > 0.0 && value > top {
                continue;
            }
            let fraction = if top > 0.0 { value / top } else { 0.0 };
            cells.push(Rectangle::new(
                [
                    (surface.x_edges[i], surface.y_edges[j]),
                    (surface.x_edges[i + 1], surface.y_edges[j + 1]),
                ],
                jet(fraction).mix(0.5).filled(),
            ));
        }
    }
    chart.draw_series(cells)?;

    // Contour lines for every level above the base.
    let mut lines = Vec::new();
    for &level in surface.levels.iter().skip(1) {
        for (a, b) in contour_segments(surface, level) {
            lines.push(PathElement::new(vec![a, b], BLACK.mix(0.7)));
        }
    }
    chart.draw_series(lines)?;

    if let Some(x_line) = options.x_metric_line {
        chart.draw_series(DashedLineSeries::new(
            [(x_line, y_min), (x_line, y_max)],
            6,
            4,
            BLACK.stroke_width(1),
        ))?;
    }
    if let Some(y_line) = options.y_metric_line {
        chart.draw_series(DashedLineSeries::new(
            [(x_min, y_line), (x_max, y_line)],
            6,
            4,
            BLACK.stroke_width(1),
        ))?;
    }

    draw_colorbar(&bar_area, surface.levels[0], top.max(surface.levels[0]))?;
    root.present()?;
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    low: f64,
    high: f64,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, h) = area.dim_in_pixel();
    let steps = 48;
    let x0 = 4;
    let x1 = (w as i32 / 3).max(x0 + 8);
    let top_pad = 30;
    let bottom_pad = 16;
    let span = (h as i32 - top_pad - bottom_pad).max(steps);

    area.draw(&Text::new(
        "Free energy",
        (2, 4),
        ("sans-serif", 11).into_font(),
    ))?;
    area.draw(&Text::new(
        "[kcal/mol]",
        (2, 16),
        ("sans-serif", 11).into_font(),
    ))?;

    for k in 0..steps {
        let fraction = k as f64 / (steps - 1) as f64;
        let y_top = top_pad + (span * k) / steps;
        let y_bottom = top_pad + (span * (k + 1)) / steps;
        // High energies at the top of the bar.
        area.draw(&Rectangle::new(
            [(x0, y_top), (x1, y_bottom)],
            jet(1.0 - fraction).mix(0.5).filled(),
        ))?;
    }
    area.draw(&Text::new(
        format!("{high:.1}"),
        (x1 + 4, top_pad),
        ("sans-serif", 11).into_font(),
    ))?;
    area.draw(&Text::new(
        format!("{low:.1}"),
        (x1 + 4, top_pad + span - 6),
        ("sans-serif", 11).into_font(),
    ))?;
    Ok(())
}

/// 2-D histogram over `bins × bins` with data-driven edges; the upper edge
/// of the last bin is inclusive.
pub fn histogram2d(
    x: &Array1<f64>,
    y: &Array1<f64>,
    bins: usize,
) -> (Array2<f64>, Vec<f64>, Vec<f64>) {
    let (x_min, x_max) = value_range(x);
    let (y_min, y_max) = value_range(y);
    let x_edges = linspace(x_min, x_max, bins + 1);
    let y_edges = linspace(y_min, y_max, bins + 1);

    let mut counts = Array2::<f64>::zeros((bins, bins));
    for (&xv, &yv) in x.iter().zip(y.iter()) {
        let i = bin_index(xv, x_min, x_max, bins);
        let j = bin_index(yv, y_min, y_max, bins);
        counts[[i, j]] += 1.0;
    }
    (counts, x_edges, y_edges)
}

fn value_range(values: &Array1<f64>) -> (f64, f64) {
    let min = values.fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if max > min {
        (min, max)
    } else {
        // Degenerate (constant) coordinate: give the single bin row a width.
        (min - 0.5, min + 0.5)
    }
}

fn bin_index(value: f64, min: f64, max: f64, bins: usize) -> usize {
    let fraction = (value - min) / (max - min);
    ((fraction * bins as f64) as usize).min(bins - 1)
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    (0..points)
        .map(|i| start + (end - start) * i as f64 / (points - 1) as f64)
        .collect()
}

fn contour_levels(grid: &Array2<f64>, cmax: Option<f64>) -> Vec<f64> {
    let top = match cmax {
        Some(value) => value,
        None => grid.fold(f64::NEG_INFINITY, |a, &b| a.max(b)) - 0.5,
    };
    if top <= 0.0 {
        return vec![0.0];
    }
    linspace(0.0, top, CONTOUR_LEVELS)
}

/// Marching squares over the grid at bin centers: one line segment per
/// crossed cell edge pair.
fn contour_segments(surface: &FreeEnergySurface, level: f64) -> Vec<((f64, f64), (f64, f64))> {
    let nx = surface.grid.nrows();
    let ny = surface.grid.ncols();
    if nx < 2 || ny < 2 {
        return Vec::new();
    }
    let cx: Vec<f64> = (0..nx)
        .map(|i| 0.5 * (surface.x_edges[i] + surface.x_edges[i + 1]))
        .collect();
    let cy: Vec<f64> = (0..ny)
        .map(|j| 0.5 * (surface.y_edges[j] + surface.y_edges[j + 1]))
        .collect();

    let mut segments = Vec::new();
    for i in 0..nx - 1 {
        for j in 0..ny - 1 {
            let v00 = surface.grid[[i, j]];
            let v10 = surface.grid[[i + 1, j]];
            let v01 = surface.grid[[i, j + 1]];
            let v11 = surface.grid[[i + 1, j + 1]];

            // Crossing points on the four cell edges.
            let mut crossings: Vec<(f64, f64)> = Vec::with_capacity(4);
            if (v00 < level) != (v10 < level) {
                let t = interpolate(v00, v10, level);
                crossings.push((cx[i] + t * (cx[i + 1] - cx[i]), cy[j]));
            }
            if (v01 < level) != (v11 < level) {
                let t = interpolate(v01, v11, level);
                crossings.push((cx[i] + t * (cx[i + 1] - cx[i]), cy[j + 1]));
            }
            if (v00 < level) != (v01 < level) {
                let t = interpolate(v00, v01, level);
                crossings.push((cx[i], cy[j] + t * (cy[j + 1] - cy[j])));
            }
            if (v10 < level) != (v11 < level) {
                let t = interpolate(v10, v11, level);
                crossings.push((cx[i + 1], cy[j] + t * (cy[j + 1] - cy[j])));
            }

            match crossings.len() {
                2 => segments.push((crossings[0], crossings[1])),
                4 => {
                    // Saddle cell; pair crossings arbitrarily but consistently.
                    segments.push((crossings[0], crossings[2]));
                    segments.push((crossings[1], crossings[3]));
                }
                _ => {}
            }
        }
    }
    segments
}

fn interpolate(a: f64, b: f64, level: f64) -> f64 {
    if (b - a).abs() < f64::EPSILON {
        0.5
    } else {
        ((level - a) / (b - a)).clamp(0.0, 1.0)
    }
}

/// Compact jet-like colormap: blue at 0, red at 1.
fn jet(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0);
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_histogram2d_counts_every_point() {
        let x = Array1::from(vec![0.0, 0.5, 1.0, 1.0]);
        let y = Array1::from(vec![0.0, 0.5, 1.0, 0.0]);
        let (counts, x_edges, y_edges) = histogram2d(&x, &y, 4);
        assert_eq!(counts.sum(), 4.0);
        assert_eq!(x_edges.len(), 5);
        assert_eq!(y_edges.len(), 5);
        // Max values land in the last (inclusive) bin.
        assert_eq!(counts[[3, 3]], 1.0);
        assert_eq!(counts[[3, 0]], 1.0);
    }

    #[test]
    fn test_uniform_histogram_gives_zero_surface() {
        // One point per cell of a 2×2 grid: all bins equal.
        let x = Array1::from(vec![0.0, 0.0, 1.0, 1.0]);
        let y = Array1::from(vec![0.0, 1.0, 0.0, 1.0]);
        let options = FreeEnergyOptions {
            bins: 2,
            sigma: 1.0,
            ..Default::default()
        };
        let surface = FreeEnergySurface::compute(&x, &y, &options).unwrap();
        for &v in surface.grid.iter() {
            assert!(v.abs() < 1e-12, "expected flat surface, got {v}");
        }
    }

    #[test]
    fn test_minimum_is_zero_and_rare_bins_cost_energy() {
        // 97 points in one cell, 1 in each of the others.
        let mut xs = vec![0.0, 0.0, 1.0];
        let mut ys = vec![1.0, 0.0, 0.0];
        for _ in 0..97 {
            xs.push(1.0);
            ys.push(1.0);
        }
        let options = FreeEnergyOptions {
            bins: 2,
            sigma: 0.0,
            ..Default::default()
        };
        let surface =
            FreeEnergySurface::compute(&Array1::from(xs), &Array1::from(ys), &options).unwrap();
        assert!(surface.grid[[1, 1]].abs() < 1e-12);
        assert!(surface.grid[[0, 0]] > 1.0);
        // -ln(1.1/97.1) * 0.592
        let expected = -(1.1f64 / 97.1).ln() * 0.592;
        assert!((surface.grid[[0, 0]] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_level_count_and_cap() {
        let grid = Array2::from_shape_fn((4, 4), |(i, j)| (i + j) as f64);
        let levels = contour_levels(&grid, None);
        assert_eq!(levels.len(), 9);
        assert_eq!(levels[0], 0.0);
        assert!((levels[8] - 5.5).abs() < 1e-12);

        let capped = contour_levels(&grid, Some(3.0));
        assert!((capped[8] - 3.0).abs() < 1e-12);

        let flat = Array2::<f64>::zeros((4, 4));
        assert_eq!(contour_levels(&flat, None), vec![0.0]);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let x = Array1::from(vec![0.0, 1.0]);
        let y = Array1::from(vec![0.0]);
        assert!(FreeEnergySurface::compute(&x, &y, &FreeEnergyOptions::default()).is_err());
        let empty: Array1<f64> = Array1::from(vec![]);
        assert!(
            FreeEnergySurface::compute(&empty, &empty, &FreeEnergyOptions::default()).is_err()
        );
    }

    #[test]
    fn test_contour_segments_cross_a_step() {
        let mut grid = Array2::<f64>::zeros((2, 2));
        grid[[1, 0]] = 2.0;
        grid[[1, 1]] = 2.0;
        let surface = FreeEnergySurface {
            grid,
            x_edges: vec![0.0, 1.0, 2.0],
            y_edges: vec![0.0, 1.0, 2.0],
            levels: vec![0.0, 1.0],
        };
        let segments = contour_segments(&surface, 1.0);
        assert_eq!(segments.len(), 1);
        // The crossing sits halfway between the two column centers.
        let ((x0, _), (x1, _)) = segments[0];
        assert!((x0 - 1.0).abs() < 1e-12);
        assert!((x1 - 1.0).abs() < 1e-12);
    }
}
