//! Trajectory segmentation.
//!
//! Splits each device's position stream into trajectories: maximal runs where
//! every consecutive gap is short enough in time and plausible in speed.
//!
//! ## Algorithm
//!
//! 1. Order positions by `(device_id, t)`.
//! 2. For each position compute `dt` and `velocity` against the previous
//!    position of the same device.
//! 3. Flag a break when `dt` is undefined, `dt > time_threshold`, velocity is
//!    undefined (zero or non-finite elapsed time) or `velocity > velocity_threshold`.
//! 4. `trajectory_id` is the running count of breaks over the whole ordered
//!    stream, so ids never collide across devices.
//! 5. Break rows are discarded. A trajectory therefore starts at the position
//!    *after* the one that opened it, and every retained row has valid kinematics.

use std::collections::HashSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::geo_utils::{elapsed_seconds, geodesic_distance};
use crate::{Position, SegmentedObservation, TrajectoryObservation};

/// Thresholds for splitting a device stream into trajectories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Largest gap between consecutive pings that stays in one trajectory, in seconds.
    /// Gaps strictly greater than this split. Default: 172800 (48 hours)
    pub time_threshold: f64,

    /// Largest plausible speed between consecutive pings, in m/s.
    /// Faster transitions split. Default: 10.0
    pub velocity_threshold: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            time_threshold: 48.0 * 3600.0,
            velocity_threshold: 10.0,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.time_threshold.is_finite() || self.time_threshold < 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "time_threshold must be a non-negative number of seconds, got {}",
                self.time_threshold
            )));
        }
        if !self.velocity_threshold.is_finite() || self.velocity_threshold < 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "velocity_threshold must be a non-negative speed, got {}",
                self.velocity_threshold
            )));
        }
        Ok(())
    }

    /// Whether a transition with these kinematics starts a new trajectory.
    pub fn is_break(&self, dt: Option<f64>, velocity: Option<f64>) -> bool {
        match (dt, velocity) {
            (Some(dt), Some(v)) => dt > self.time_threshold || v > self.velocity_threshold,
            _ => true,
        }
    }
}

/// Counts describing one segmentation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationStats {
    pub input_positions: usize,
    pub retained: usize,
    /// Break-flagged rows (equals the final running break count).
    pub discarded: usize,
    /// Distinct trajectory ids among retained rows.
    pub trajectories: usize,
    pub devices: usize,
}

/// Output of [`identify_trajectories`].
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub trajectories: Vec<TrajectoryObservation>,
    pub stats: SegmentationStats,
}

impl Segmentation {
    /// Highest trajectory id among retained rows (0 when nothing was retained).
    pub fn max_trajectory_id(&self) -> u64 {
        self.trajectories
            .iter()
            .map(|o| o.trajectory_id)
            .max()
            .unwrap_or(0)
    }

    /// Retained rows grouped by trajectory, in id order.
    pub fn by_trajectory(&self) -> Vec<(u64, &[TrajectoryObservation])> {
        self.trajectories
            .chunk_by(|a, b| a.trajectory_id == b.trajectory_id)
            .map(|run| (run[0].trajectory_id, run))
            .collect()
    }
}

/// Velocity over a gap, or None when it is undefined.
fn transition_velocity(distance: f64, dt: f64) -> Option<f64> {
    if dt <= 0.0 {
        return None;
    }
    let v = distance / dt;
    v.is_finite().then_some(v)
}

/// Compute `dt`, `velocity` and `break_flag` for every position (steps 1-3).
///
/// The result is ordered by `(device_id, t)`; ties keep their input order.
pub fn segment_observations(
    positions: &[Position],
    config: &SegmentationConfig,
) -> Vec<SegmentedObservation> {
    let mut ordered = positions.to_vec();
    ordered.sort_by_key(|p| (p.device_id, p.t));

    let mut segmented = Vec::with_capacity(ordered.len());
    let mut previous: Option<&Position> = None;

    for current in &ordered {
        let (dt, velocity) = match previous {
            Some(prev) if prev.device_id == current.device_id => {
                let dt = elapsed_seconds(&prev.t, &current.t);
                let distance = geodesic_distance(&prev.pos, &current.pos);
                (Some(dt), transition_velocity(distance, dt))
            }
            _ => (None, None),
        };

        segmented.push(SegmentedObservation {
            position: *current,
            dt,
            velocity,
            break_flag: config.is_break(dt, velocity),
        });
        previous = Some(current);
    }

    segmented
}

/// Number trajectories with a global running break count and drop break rows (steps 4-5).
pub fn assign_trajectories(segmented: &[SegmentedObservation]) -> Vec<TrajectoryObservation> {
    let mut breaks: u64 = 0;
    let mut retained = Vec::with_capacity(segmented.len());

    for row in segmented {
        if row.break_flag {
            breaks += 1;
            continue;
        }
        // Unflagged rows always carry both values
        if let (Some(dt), Some(velocity)) = (row.dt, row.velocity) {
            retained.push(TrajectoryObservation {
                trajectory_id: breaks,
                position: row.position,
                dt,
                velocity,
            });
        }
    }

    retained
}

/// Segment cleaned positions into trajectories.
///
/// # Example
/// ```
/// use chrono::{Duration, NaiveDate};
/// use flocktrack::{GpsPoint, Position, SegmentationConfig, identify_trajectories};
///
/// let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let positions: Vec<Position> = [0, 1, 2, 51, 52]
///     .iter()
///     .map(|h| Position { device_id: 7, t: start + Duration::hours(*h), pos: GpsPoint::new(63.4, 11.2) })
///     .collect();
///
/// let result = identify_trajectories(&positions, &SegmentationConfig::default());
/// // Breaks at the first ping and after the 49 hour gap
/// assert_eq!(result.stats.discarded, 2);
/// assert_eq!(result.stats.trajectories, 2);
/// ```
pub fn identify_trajectories(positions: &[Position], config: &SegmentationConfig) -> Segmentation {
    let segmented = segment_observations(positions, config);
    let trajectories = assign_trajectories(&segmented);

    let discarded = segmented.iter().filter(|s| s.break_flag).count();
    let devices: HashSet<i64> = segmented.iter().map(|s| s.position.device_id).collect();
    let trajectory_ids: HashSet<u64> = trajectories.iter().map(|o| o.trajectory_id).collect();

    let stats = SegmentationStats {
        input_positions: positions.len(),
        retained: trajectories.len(),
        discarded,
        trajectories: trajectory_ids.len(),
        devices: devices.len(),
    };

    debug!(
        "[Segmentation] thresholds: dt > {}s or v > {} m/s splits",
        config.time_threshold, config.velocity_threshold
    );
    info!(
        "[Segmentation] {} positions from {} devices -> {} trajectories ({} retained, {} break rows discarded)",
        stats.input_positions, stats.devices, stats.trajectories, stats.retained, stats.discarded
    );

    Segmentation {
        trajectories,
        stats,
    }
}
