//! Cluster-count selection diagnostic.
//!
//! Fits k-means for each candidate `k` and reports the inertia, so a human
//! (or a downstream policy) can pick `k` where the curve flattens. Nothing
//! here chooses `k`.

use std::ops::RangeInclusive;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::FeatureRow;
use crate::error::{Result, TrackError};
use crate::kmeans::{self, KMeansConfig, KMeansModel};

/// Candidate cluster counts evaluated by [`elbow_curve`].
pub const CANDIDATE_K: RangeInclusive<usize> = 2..=9;

/// Inertia of the best k-means fit for one cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
}

/// Inertia for each `k` in [`CANDIDATE_K`] on `(velocity, tx, ty)`.
///
/// Candidates larger than the number of rows are skipped with a warning. Each
/// `k` also tries a warm start from the previous best centroids plus the point
/// farthest from them, which keeps the curve non-increasing.
pub fn elbow_curve(rows: &[FeatureRow], config: &KMeansConfig) -> Result<Vec<ElbowPoint>> {
    if rows.is_empty() {
        return Err(TrackError::EmptyInput { stage: "elbow" });
    }
    let first_k = *CANDIDATE_K.start();
    if rows.len() < first_k {
        return Err(TrackError::InvalidClusterCount {
            k: first_k,
            rows: rows.len(),
        });
    }
    if rows.len() < *CANDIDATE_K.end() {
        warn!(
            "[Elbow] Only {} feature rows; evaluating k up to {}",
            rows.len(),
            rows.len()
        );
    }

    let points: Vec<[f64; 3]> = rows.iter().map(FeatureRow::vector).collect();
    let mut curve = Vec::new();
    let mut previous: Option<KMeansModel<3>> = None;

    for k in CANDIDATE_K.filter(|k| *k <= points.len()) {
        let mut best = kmeans::fit(&points, k, config)?;

        if let Some(prev) = &previous {
            if let Some(idx) = kmeans::farthest_point(&points, &prev.centroids) {
                let mut initial = prev.centroids.clone();
                initial.push(points[idx]);
                let warm = kmeans::fit_from(&points, initial, config);
                if warm.inertia < best.inertia {
                    best = warm;
                }
            }
        }

        info!("[Elbow] k={} inertia={:.4}", k, best.inertia);
        curve.push(ElbowPoint {
            k,
            inertia: best.inertia,
        });
        previous = Some(best);
    }

    Ok(curve)
}
