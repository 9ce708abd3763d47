//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// `per_center` points around each center with isotropic standard deviation `std`.
pub fn gaussian_blobs(centers: &[[f64; 2]], per_center: usize, std: f64, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, std).unwrap();
    let mut values = Vec::with_capacity(centers.len() * per_center * 2);
    for center in centers {
        for _ in 0..per_center {
            values.push(center[0] + noise.sample(&mut rng));
            values.push(center[1] + noise.sample(&mut rng));
        }
    }
    DMatrix::from_row_slice(centers.len() * per_center, 2, &values)
}

/// Log-density of N(mean, cov) at `x`, computed with an explicit inverse.
pub fn gaussian_log_pdf(x: &DVector<f64>, mean: &DVector<f64>, cov: &DMatrix<f64>) -> f64 {
    let d = x.len() as f64;
    let diff = x - mean;
    let inv = cov.clone().try_inverse().unwrap();
    let maha = (diff.transpose() * inv * &diff)[(0, 0)];
    -0.5 * (d * (2.0 * std::f64::consts::PI).ln() + cov.determinant().ln() + maha)
}

/// Index of the row of `means` closest to `point`.
pub fn closest_mean(means: &DMatrix<f64>, point: &[f64]) -> usize {
    let p = DVector::from_row_slice(point);
    (0..means.nrows())
        .min_by(|&a, &b| {
            let da = (means.row(a).transpose() - &p).norm();
            let db = (means.row(b).transpose() - &p).norm();
            da.partial_cmp(&db).unwrap()
        })
        .unwrap()
}
