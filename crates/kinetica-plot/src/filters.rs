//! Gaussian smoothing for binned surfaces.
use ndarray::Array2;

/// Kernel extent in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Separable Gaussian blur with reflected boundaries
/// (`d c b a | a b c d | d c b a`). A non-positive sigma returns the input
/// unchanged.
pub fn gaussian_filter(data: &Array2<f64>, sigma: f64) -> Array2<f64> {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (rows, cols) = data.dim();

    let mut pass = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let rr = reflect(r as isize + k as isize - radius, rows);
                acc += w * data[[rr, c]];
            }
            pass[[r, c]] = acc;
        }
    }

    let mut out = Array2::<f64>::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let cc = reflect(c as isize + k as isize - radius, cols);
                acc += w * pass[[r, cc]];
            }
            out[[r, c]] = acc;
        }
    }
    out
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let mut i = index;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_zero_sigma_is_identity() {
        let data = Array2::from_shape_fn((5, 5), |(i, j)| (i * 7 + j) as f64);
        assert_eq!(gaussian_filter(&data, 0.0), data);
    }

    #[test]
    fn test_constant_input_unchanged() {
        let data = Array2::from_elem((8, 8), 2.5);
        let smoothed = gaussian_filter(&data, 1.3);
        for &v in smoothed.iter() {
            assert!((v - 2.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_impulse_spreads_symmetrically() {
        let mut data = Array2::<f64>::zeros((9, 9));
        data[[4, 4]] = 1.0;
        let smoothed = gaussian_filter(&data, 1.0);
        assert!(smoothed[[4, 4]] < 1.0);
        assert!(smoothed[[3, 4]] > 0.0);
        assert!((smoothed[[3, 4]] - smoothed[[5, 4]]).abs() < 1e-12);
        assert!((smoothed[[4, 3]] - smoothed[[4, 5]]).abs() < 1e-12);
        assert!((smoothed[[3, 4]] - smoothed[[4, 3]]).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_is_normalized() {
        let kernel = gaussian_kernel(0.99);
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(kernel.len() % 2, 1);
    }

    #[test]
    fn test_reflect_boundary() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
    }
}
