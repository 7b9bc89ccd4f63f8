//! Time-lagged independent component analysis.
//!
//! TICA finds the linear combinations of input features with the slowest
//! decorrelation at a fixed lag time. The fit solves the generalized
//! eigenproblem Cτ v = λ C0 v by whitening with the instantaneous
//! covariance C0 and diagonalizing the whitened time-lagged covariance;
//! both estimates are symmetrized (reversible estimator).
use crate::{Error, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{s, Array1, Array2, Axis};

/// Fraction of kinetic variance (cumulative squared eigenvalues) retained
/// when choosing the output dimensionality.
pub const KINETIC_VARIANCE_CUTOFF: f64 = 0.95;

/// Relative eigenvalue floor below which a C0 direction is treated as null.
const WHITENING_EPSILON: f64 = 1e-12;

/// A fitted TICA transform.
#[derive(Debug, Clone)]
pub struct TicaModel {
    lag: usize,
    mean: Array1<f64>,
    components: Array2<f64>,
    eigenvalues: Vec<f64>,
    ndims: usize,
}

impl TicaModel {
    /// Fits on a pool of (frames × features) trajectories at the given lag.
    ///
    /// Trajectories with `lag` or fewer frames contribute nothing; if every
    /// trajectory is that short the fit fails with [`Error::LagTooLarge`].
    pub fn fit(trajectories: &[Array2<f64>], lag: usize) -> Result<Self> {
        if lag == 0 {
            return Err(Error::InvalidLag);
        }
        let dim = trajectories
            .first()
            .ok_or(Error::EmptyFeatureSet)?
            .ncols();
        if dim == 0 {
            return Err(Error::EmptyFeatureSet);
        }

        // Pooled mean over every frame.
        let mut mean = Array1::<f64>::zeros(dim);
        let mut frames = 0usize;
        for x in trajectories {
            mean += &x.sum_axis(Axis(0));
            frames += x.nrows();
        }
        if frames == 0 {
            return Err(Error::EmptyFeatureSet);
        }
        mean /= frames as f64;

        // Symmetrized covariance estimates over all frame pairs at `lag`.
        let mut c0 = DMatrix::<f64>::zeros(dim, dim);
        let mut ct = DMatrix::<f64>::zeros(dim, dim);
        let mut pairs = 0usize;
        for x in trajectories {
            let n = x.nrows();
            if n <= lag {
                continue;
            }
            let m = n - lag;
            let centered = DMatrix::from_fn(n, dim, |i, j| x[[i, j]] - mean[j]);
            let head = centered.rows(0, m);
            let tail = centered.rows(lag, m);
            c0 += head.transpose() * head + tail.transpose() * tail;
            ct += head.transpose() * tail + tail.transpose() * head;
            pairs += 2 * m;
        }
        if pairs == 0 {
            return Err(Error::LagTooLarge { lag });
        }
        c0 /= pairs as f64;
        ct /= pairs as f64;

        // Whitening basis from C0's spectrum; null directions are dropped.
        let eig0 = SymmetricEigen::new(c0);
        let max_ev = eig0
            .eigenvalues
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        if !(max_ev > 0.0) {
            return Err(Error::DegenerateCovariance);
        }
        let kept: Vec<usize> = (0..dim)
            .filter(|&i| eig0.eigenvalues[i] > max_ev * WHITENING_EPSILON)
            .collect();
        let mut whitener = DMatrix::<f64>::zeros(dim, kept.len());
        for (k, &i) in kept.iter().enumerate() {
            let scale = eig0.eigenvalues[i].sqrt().recip();
            whitener.set_column(k, &(eig0.eigenvectors.column(i) * scale));
        }

        let projected = whitener.transpose() * (&ct * &whitener);
        let symmetrized = (projected.clone() + projected.transpose()) * 0.5;
        let eig_t = SymmetricEigen::new(symmetrized);

        // nalgebra does not guarantee eigenvalue order; sort descending.
        let mut order: Vec<usize> = (0..eig_t.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| {
            eig_t.eigenvalues[b]
                .partial_cmp(&eig_t.eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let basis = &whitener * &eig_t.eigenvectors;
        let eigenvalues: Vec<f64> = order.iter().map(|&i| eig_t.eigenvalues[i]).collect();
        let mut components = Array2::<f64>::zeros((dim, order.len()));
        for (k, &i) in order.iter().enumerate() {
            for r in 0..dim {
                components[[r, k]] = basis[(r, i)];
            }
        }

        let ndims = retained_dimensions(&eigenvalues);

        Ok(Self {
            lag,
            mean,
            components,
            eigenvalues,
            ndims,
        })
    }

    /// Projects a (frames × features) matrix onto the retained components.
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let centered = data - &self.mean;
        centered.dot(&self.components.slice(s![.., ..self.ndims]))
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Output dimensionality holding [`KINETIC_VARIANCE_CUTOFF`] of the
    /// kinetic variance.
    pub fn ndims(&self) -> usize {
        self.ndims
    }

    /// Autocorrelation eigenvalues, descending.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Input feature dimension the model was fitted on.
    pub fn dimension(&self) -> usize {
        self.components.nrows()
    }
}

fn retained_dimensions(eigenvalues: &[f64]) -> usize {
    let total: f64 = eigenvalues.iter().map(|l| l * l).sum();
    if total <= 0.0 {
        return eigenvalues.len().min(1).max(1);
    }
    let mut cumulative = 0.0;
    for (i, l) in eigenvalues.iter().enumerate() {
        cumulative += l * l;
        if cumulative >= KINETIC_VARIANCE_CUTOFF * total {
            return i + 1;
        }
    }
    eigenvalues.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Two-column signal: a slow cosine and fast alternating noise.
    fn slow_fast_trajectory(frames: usize) -> Array2<f64> {
        Array2::from_shape_fn((frames, 2), |(i, j)| {
            if j == 0 {
                (i as f64 * 0.02).cos()
            } else {
                if i % 2 == 0 {
                    1.0
                } else {
                    -1.0
                }
            }
        })
    }

    #[test]
    fn test_fit_orders_eigenvalues_descending() {
        let model = TicaModel::fit(&[slow_fast_trajectory(500)], 5).unwrap();
        let ev = model.eigenvalues();
        for pair in ev.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        // The slow cosine dominates at this lag.
        assert!(ev[0] > 0.9, "slow mode eigenvalue {}", ev[0]);
    }

    #[test]
    fn test_transform_shape() {
        let data = slow_fast_trajectory(300);
        let model = TicaModel::fit(&[data.clone()], 3).unwrap();
        let y = model.transform(&data);
        assert_eq!(y.nrows(), 300);
        assert_eq!(y.ncols(), model.ndims());
        assert!(model.ndims() >= 1);
        assert_eq!(model.dimension(), 2);
    }

    #[test]
    fn test_zero_lag_rejected() {
        let data = slow_fast_trajectory(50);
        assert!(matches!(
            TicaModel::fit(&[data], 0),
            Err(Error::InvalidLag)
        ));
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            TicaModel::fit(&[], 1),
            Err(Error::EmptyFeatureSet)
        ));
    }

    #[test]
    fn test_lag_longer_than_every_trajectory() {
        let data = slow_fast_trajectory(10);
        assert!(matches!(
            TicaModel::fit(&[data], 10),
            Err(Error::LagTooLarge { lag: 10 })
        ));
    }

    #[test]
    fn test_constant_signal_is_degenerate() {
        let data = Array2::from_elem((100, 2), 3.5);
        assert!(matches!(
            TicaModel::fit(&[data], 1),
            Err(Error::DegenerateCovariance)
        ));
    }

    #[test]
    fn test_retained_dimensions_cutoff() {
        // One dominant eigenvalue carries >95% of the squared mass.
        assert_eq!(retained_dimensions(&[1.0, 0.1, 0.1]), 1);
        // Two equal eigenvalues need both.
        assert_eq!(retained_dimensions(&[0.9, 0.9]), 2);
    }
}
