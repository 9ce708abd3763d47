//! Single-precision k-means used to bootstrap the mixture.
//!
//! Centers are seeded with k-means++; each attempt runs Lloyd iterations
//! until the iteration budget is exhausted or no center moves by more than
//! the movement tolerance. The attempt with the lowest compactness wins.

use nalgebra::DMatrix;
use rand::Rng;

/// Stopping rule for the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansCriteria {
    pub max_iters: usize,
    /// Largest Euclidean center movement that still counts as converged.
    pub epsilon: f32,
    pub attempts: usize,
}

impl KMeansCriteria {
    /// Criteria for a bootstrap without seeds: 10 restarts of at most 10 iterations.
    pub fn bootstrap() -> Self {
        Self {
            max_iters: 10,
            epsilon: 0.5,
            attempts: 10,
        }
    }

    /// Criteria when the caller already supplied centers: one refinement pass.
    pub fn seeded() -> Self {
        Self {
            max_iters: 1,
            epsilon: 0.5,
            attempts: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// K×D cluster centers.
    pub centers: DMatrix<f32>,
    /// Cluster index of every sample; every cluster owns at least one sample.
    pub labels: Vec<usize>,
    /// Sum of squared distances of samples to their center.
    pub compactness: f64,
}

#[inline]
fn dist_sq(data: &DMatrix<f32>, row: usize, centers: &DMatrix<f32>, c: usize) -> f32 {
    (0..data.ncols())
        .map(|d| {
            let v = data[(row, d)] - centers[(c, d)];
            v * v
        })
        .sum()
}

fn nearest_center(data: &DMatrix<f32>, row: usize, centers: &DMatrix<f32>) -> (usize, f32) {
    let mut best = 0;
    let mut best_dist = dist_sq(data, row, centers, 0);
    for c in 1..centers.nrows() {
        let dist = dist_sq(data, row, centers, c);
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    (best, best_dist)
}

fn assign(data: &DMatrix<f32>, centers: &DMatrix<f32>) -> Vec<usize> {
    (0..data.nrows())
        .map(|row| nearest_center(data, row, centers).0)
        .collect()
}

/// k-means++ seeding: each new center is drawn with probability proportional
/// to its squared distance from the closest center chosen so far.
fn seed_plus_plus<R: Rng + ?Sized>(data: &DMatrix<f32>, k: usize, rng: &mut R) -> DMatrix<f32> {
    let n = data.nrows();
    let mut centers = DMatrix::zeros(k, data.ncols());
    let first = rng.gen_range(0..n);
    centers.set_row(0, &data.row(first));

    let mut closest: Vec<f64> = (0..n)
        .map(|row| dist_sq(data, row, &centers, 0) as f64)
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut idx = n - 1;
            for (i, &w) in closest.iter().enumerate() {
                cumsum += w;
                if cumsum >= target && w > 0.0 {
                    idx = i;
                    break;
                }
            }
            idx
        } else {
            rng.gen_range(0..n)
        };
        centers.set_row(c, &data.row(chosen));
        for (row, best) in closest.iter_mut().enumerate() {
            let dist = dist_sq(data, row, &centers, c) as f64;
            if dist < *best {
                *best = dist;
            }
        }
    }
    centers
}

fn compute_centers(data: &DMatrix<f32>, labels: &[usize], k: usize) -> DMatrix<f32> {
    let mut sums = DMatrix::<f64>::zeros(k, data.ncols());
    let mut counts = vec![0usize; k];
    for (row, &label) in labels.iter().enumerate() {
        counts[label] += 1;
        for d in 0..data.ncols() {
            sums[(label, d)] += data[(row, d)] as f64;
        }
    }
    DMatrix::from_fn(k, data.ncols(), |c, d| {
        if counts[c] == 0 {
            0.0
        } else {
            (sums[(c, d)] / counts[c] as f64) as f32
        }
    })
}

/// Give every empty cluster the sample farthest from the center of the
/// currently largest cluster.
fn fill_empty_clusters(data: &DMatrix<f32>, centers: &mut DMatrix<f32>, labels: &mut [usize]) {
    let k = centers.nrows();
    loop {
        let mut counts = vec![0usize; k];
        for &label in labels.iter() {
            counts[label] += 1;
        }
        let Some(empty) = counts.iter().position(|&c| c == 0) else {
            return;
        };
        let largest = (0..k).fold(0, |best, c| if counts[c] > counts[best] { c } else { best });
        if counts[largest] < 2 {
            return;
        }
        let mut farthest = None;
        let mut farthest_dist = -1.0f32;
        for (row, &label) in labels.iter().enumerate() {
            if label != largest {
                continue;
            }
            let dist = dist_sq(data, row, centers, largest);
            if dist > farthest_dist {
                farthest_dist = dist;
                farthest = Some(row);
            }
        }
        let Some(row) = farthest else {
            return;
        };
        labels[row] = empty;
        centers.set_row(empty, &data.row(row));
        log::debug!(
            "k-means: cluster {} was empty, took sample {} from cluster {}",
            empty,
            row,
            largest
        );
    }
}

fn max_center_shift(a: &DMatrix<f32>, b: &DMatrix<f32>) -> f32 {
    (0..a.nrows())
        .map(|c| dist_sq(a, c, b, c).sqrt())
        .fold(0.0, f32::max)
}

fn run_attempt(
    data: &DMatrix<f32>,
    mut centers: DMatrix<f32>,
    criteria: &KMeansCriteria,
) -> KMeansResult {
    let k = centers.nrows();
    let mut labels = assign(data, &centers);
    for _ in 0..criteria.max_iters {
        fill_empty_clusters(data, &mut centers, &mut labels);
        let updated = compute_centers(data, &labels, k);
        let shift = max_center_shift(&centers, &updated);
        centers = updated;
        labels = assign(data, &centers);
        if shift < criteria.epsilon {
            break;
        }
    }
    fill_empty_clusters(data, &mut centers, &mut labels);

    let compactness = labels
        .iter()
        .enumerate()
        .map(|(row, &label)| dist_sq(data, row, &centers, label) as f64)
        .sum();
    KMeansResult {
        centers,
        labels,
        compactness,
    }
}

/// Partition the rows of `data` into `k` clusters.
///
/// With `initial_centers` every attempt starts from the supplied centers;
/// otherwise each attempt draws fresh k-means++ seeds from `rng`.
/// Requires `0 < k <= data.nrows()`.
pub fn kmeans<R: Rng + ?Sized>(
    data: &DMatrix<f32>,
    k: usize,
    criteria: &KMeansCriteria,
    initial_centers: Option<&DMatrix<f32>>,
    rng: &mut R,
) -> KMeansResult {
    let mut best: Option<KMeansResult> = None;
    for attempt in 0..criteria.attempts.max(1) {
        let centers = match initial_centers {
            Some(c) => c.clone(),
            None => seed_plus_plus(data, k, rng),
        };
        let result = run_attempt(data, centers, criteria);
        log::debug!(
            "k-means attempt {}: compactness {:.6}",
            attempt,
            result.compactness
        );
        let better = best
            .as_ref()
            .map_or(true, |b| result.compactness < b.compactness);
        if better {
            best = Some(result);
        }
    }
    match best {
        Some(result) => result,
        None => run_attempt(data, DMatrix::zeros(k, data.ncols()), criteria),
    }
}
