//! Clustering and per-cluster rollup aggregation.
//!
//! Labels come back paired with the rows they describe, so no positional join
//! between separately stored tables is needed. Summaries use circular
//! statistics for time of day:
//!
//! - mean direction: `atan2(mean ty, mean tx)` mapped back to a clock time
//! - amplitude: length of the mean vector, `1` when all members share one time
//!   of day and near `0` when they are spread around the clock

use std::collections::BTreeMap;

use chrono::NaiveTime;
use log::info;
use serde::{Deserialize, Serialize};

use crate::FeatureRow;
use crate::error::{Result, TrackError};
use crate::features::decode_time_of_day;
use crate::kmeans::{self, KMeansConfig};

/// A feature row with the cluster it was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusteredRow {
    pub row: FeatureRow,
    pub label: usize,
}

/// Summary statistics for one cluster, or for all rows when `label` is None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster label; None marks the rollup (grand total) row.
    pub label: Option<usize>,
    pub count: usize,
    /// Mean speed in m/s
    pub mean_velocity: f64,
    /// Circular mean time of day
    pub time_of_day: NaiveTime,
    /// Circular mean time of day in seconds since midnight, `[0, 86400)`
    pub time_of_day_seconds: f64,
    /// Resultant length of the mean time-of-day vector, `[0, 1]`
    pub amplitude: f64,
}

impl ClusterSummary {
    pub fn is_rollup(&self) -> bool {
        self.label.is_none()
    }
}

/// Running sums for one group.
#[derive(Debug, Clone, Copy, Default)]
struct CircularAccumulator {
    count: usize,
    velocity: f64,
    tx: f64,
    ty: f64,
}

impl CircularAccumulator {
    fn add(&mut self, row: &FeatureRow) {
        self.count += 1;
        self.velocity += row.velocity;
        self.tx += row.tx;
        self.ty += row.ty;
    }

    fn finish(&self, label: Option<usize>) -> ClusterSummary {
        let n = self.count as f64;
        let mean_tx = self.tx / n;
        let mean_ty = self.ty / n;
        let seconds = decode_time_of_day(mean_tx, mean_ty);

        ClusterSummary {
            label,
            count: self.count,
            mean_velocity: self.velocity / n,
            time_of_day: seconds_to_time(seconds),
            time_of_day_seconds: seconds,
            amplitude: mean_tx.hypot(mean_ty).clamp(0.0, 1.0),
        }
    }
}

fn seconds_to_time(seconds: f64) -> NaiveTime {
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9) as u32).min(999_999_999);
    NaiveTime::from_num_seconds_from_midnight_opt(whole as u32, nanos).unwrap_or(NaiveTime::MIN)
}

/// Cluster feature rows on `(velocity, tx, ty)` into `k` groups.
///
/// Returns one [`ClusteredRow`] per input row, in input order.
pub fn cluster_features(
    rows: &[FeatureRow],
    k: usize,
    config: &KMeansConfig,
) -> Result<Vec<ClusteredRow>> {
    if rows.is_empty() {
        return Err(TrackError::EmptyInput {
            stage: "clustering",
        });
    }
    kmeans::validate_cluster_count(k, rows.len())?;

    let points: Vec<[f64; 3]> = rows.iter().map(FeatureRow::vector).collect();
    let model = kmeans::fit(&points, k, config)?;

    info!(
        "[Clustering] {} rows into {} clusters, inertia {:.4}",
        rows.len(),
        k,
        model.inertia
    );

    Ok(rows
        .iter()
        .zip(model.labels)
        .map(|(row, label)| ClusteredRow { row: *row, label })
        .collect())
}

/// Per-cluster summaries in ascending label order, followed by the rollup row.
///
/// Labels with no members do not appear.
pub fn summarize_clusters(clustered: &[ClusteredRow]) -> Result<Vec<ClusterSummary>> {
    if clustered.is_empty() {
        return Err(TrackError::EmptyInput {
            stage: "aggregation",
        });
    }

    let mut groups: BTreeMap<usize, CircularAccumulator> = BTreeMap::new();
    let mut total = CircularAccumulator::default();

    for item in clustered {
        groups.entry(item.label).or_default().add(&item.row);
        total.add(&item.row);
    }

    let mut summaries: Vec<ClusterSummary> = groups
        .iter()
        .map(|(label, acc)| acc.finish(Some(*label)))
        .collect();
    summaries.push(total.finish(None));

    Ok(summaries)
}
