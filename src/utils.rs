use nalgebra::{DMatrix, DVector};

/// ln(2π), the per-dimension normalization term of a Gaussian log-density.
pub const LOG_2PI: f64 = 1.837_877_066_409_345_5;

/// Log-space sum-exp trick: log(Σ exp(x_i)) = max(x) + log(Σ exp(x_i - max(x)))
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max_val == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = values.iter().map(|&x| (x - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Turn each row into a probability distribution.
///
/// Negative entries are clamped to zero. A row whose largest entry is below
/// `f32::EPSILON` carries no usable information and becomes uniform;
/// every other row is L1-normalized.
pub fn normalize_probability_rows(probs: &mut DMatrix<f64>) {
    let ncols = probs.ncols();
    if ncols == 0 {
        return;
    }
    let uniform = 1.0 / ncols as f64;
    for mut row in probs.row_iter_mut() {
        for p in row.iter_mut() {
            *p = p.max(0.0);
        }
        let max_val = row.iter().copied().fold(0.0, f64::max);
        if max_val < f32::EPSILON as f64 {
            row.fill(uniform);
        } else {
            let sum = row.sum();
            row /= sum;
        }
    }
}

/// Same normalization as [`normalize_probability_rows`] for a single vector.
pub fn normalize_probability_vector(values: &DVector<f64>) -> DVector<f64> {
    let mut m = DMatrix::from_row_slice(1, values.len(), values.as_slice());
    normalize_probability_rows(&mut m);
    DVector::from_iterator(values.len(), m.iter().copied())
}
