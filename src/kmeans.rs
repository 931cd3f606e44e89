//! K-means clustering (Lloyd's algorithm with k-means++ seeding).
//!
//! Shared by the elbow diagnostic and the final clustering step. Runs are
//! deterministic for a given [`KMeansConfig::seed`].

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

/// Configuration for k-means fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Iteration cap for a single Lloyd run. Default: 300
    pub max_iterations: usize,

    /// Stop once no centroid moves more than this (squared Euclidean distance).
    /// Default: 1e-4
    pub tolerance: f64,

    /// Independent k-means++ restarts; the lowest-inertia run wins. Default: 10
    pub n_init: usize,

    /// RNG seed for k-means++ seeding. Default: 0
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed: 0,
        }
    }
}

impl KMeansConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(TrackError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.n_init == 0 {
            return Err(TrackError::InvalidConfig(
                "n_init must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// A fitted k-means model.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel<const D: usize> {
    pub centroids: Vec<[f64; D]>,
    /// Cluster label per input point, positionally aligned with the input.
    pub labels: Vec<usize>,
    /// Sum of squared distances from each point to its assigned centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning run.
    pub iterations: usize,
}

impl<const D: usize> KMeansModel<D> {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Label of the centroid nearest to `point`.
    pub fn predict(&self, point: &[f64; D]) -> usize {
        nearest_centroid(point, &self.centroids).0
    }
}

/// Check that `k` clusters can be fitted to `rows` points.
pub fn validate_cluster_count(k: usize, rows: usize) -> Result<()> {
    if rows == 0 {
        return Err(TrackError::EmptyInput {
            stage: "clustering",
        });
    }
    if k < 1 || k > rows {
        return Err(TrackError::InvalidClusterCount { k, rows });
    }
    Ok(())
}

#[inline]
pub(crate) fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the nearest centroid and the squared distance to it.
fn nearest_centroid<const D: usize>(point: &[f64; D], centroids: &[[f64; D]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

/// Assign every point to its nearest centroid.
fn assign<const D: usize>(points: &[[f64; D]], centroids: &[[f64; D]]) -> Vec<(usize, f64)> {
    #[cfg(feature = "parallel")]
    {
        points
            .par_iter()
            .map(|p| nearest_centroid(p, centroids))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        points
            .iter()
            .map(|p| nearest_centroid(p, centroids))
            .collect()
    }
}

/// Mean of the assigned points per cluster. Empty clusters are re-seeded at
/// the points currently farthest from their centroids.
fn update_centroids<const D: usize>(
    points: &[[f64; D]],
    assignment: &[(usize, f64)],
    previous: &[[f64; D]],
) -> Vec<[f64; D]> {
    let k = previous.len();
    let mut sums = vec![[0.0; D]; k];
    let mut counts = vec![0usize; k];

    for (point, (label, _)) in points.iter().zip(assignment) {
        counts[*label] += 1;
        for (s, x) in sums[*label].iter_mut().zip(point) {
            *s += x;
        }
    }

    let mut centroids = previous.to_vec();
    let mut distances: Vec<f64> = assignment.iter().map(|(_, d)| *d).collect();

    for cluster in 0..k {
        if counts[cluster] > 0 {
            let n = counts[cluster] as f64;
            for (c, s) in centroids[cluster].iter_mut().zip(&sums[cluster]) {
                *c = s / n;
            }
        } else {
            let farthest = distances
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            centroids[cluster] = points[farthest];
            distances[farthest] = 0.0;
        }
    }

    centroids
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the nearest existing one.
fn kmeans_plus_plus<const D: usize>(points: &[[f64; D]], k: usize, rng: &mut StdRng) -> Vec<[f64; D]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut min_dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_dist.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.r#gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (idx, d) in min_dist.iter().enumerate() {
                if target < *d {
                    chosen = idx;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point coincides with a centroid already
            rng.gen_range(0..points.len())
        };

        let centroid = points[next];
        for (d, p) in min_dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Run Lloyd iterations from the given initial centroids.
///
/// Inertia never exceeds that of the initial assignment, which the elbow
/// diagnostic relies on for warm starts.
pub fn fit_from<const D: usize>(
    points: &[[f64; D]],
    initial: Vec<[f64; D]>,
    config: &KMeansConfig,
) -> KMeansModel<D> {
    let mut centroids = initial;
    let mut assignment = assign(points, &centroids);
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let updated = update_centroids(points, &assignment, &centroids);
        let shift = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b))
            .fold(0.0, f64::max);
        centroids = updated;

        let reassigned = assign(points, &centroids);
        let stable = reassigned
            .iter()
            .zip(&assignment)
            .all(|(a, b)| a.0 == b.0);
        assignment = reassigned;

        if stable || shift <= config.tolerance {
            break;
        }
    }

    let inertia = assignment.iter().map(|(_, d)| d).sum();
    KMeansModel {
        centroids,
        labels: assignment.into_iter().map(|(label, _)| label).collect(),
        inertia,
        iterations,
    }
}

/// Fit `k` clusters, keeping the best of `n_init` k-means++ restarts.
///
/// Fails with [`TrackError::EmptyInput`] for no points and
/// [`TrackError::InvalidClusterCount`] when `k` is 0 or exceeds the point count,
/// before any iteration runs.
pub fn fit<const D: usize>(
    points: &[[f64; D]],
    k: usize,
    config: &KMeansConfig,
) -> Result<KMeansModel<D>> {
    validate_cluster_count(k, points.len())?;
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansModel<D>> = None;

    for run in 0..config.n_init {
        let initial = kmeans_plus_plus(points, k, &mut rng);
        let model = fit_from(points, initial, config);
        debug!(
            "[KMeans] k={} run {}: inertia {:.6} after {} iterations",
            k, run, model.inertia, model.iterations
        );
        if best.as_ref().is_none_or(|b| model.inertia < b.inertia) {
            best = Some(model);
        }
    }

    best.ok_or(TrackError::InvalidConfig(
        "n_init must be at least 1".to_string(),
    ))
}

/// Index of the point farthest from its nearest centroid.
pub(crate) fn farthest_point<const D: usize>(points: &[[f64; D]], centroids: &[[f64; D]]) -> Option<usize> {
    assign(points, centroids)
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.1.total_cmp(&b.1.1))
        .map(|(idx, _)| idx)
}
