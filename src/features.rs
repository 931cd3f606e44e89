//! Feature extraction for clustering.
//!
//! Time of day is cyclic: 23:59 and 00:01 are two minutes apart, but a raw
//! seconds-since-midnight scalar puts them at opposite ends of the range.
//! Mapping it onto the unit circle as `(cos θ, sin θ)` removes the seam for
//! distance-based clustering.

use std::f64::consts::TAU;

use chrono::NaiveDateTime;
use log::debug;

use crate::geo_utils::{SECONDS_PER_DAY, seconds_since_midnight};
use crate::{FeatureRow, TrajectoryObservation};

/// Time-of-day angle in radians, `0` at midnight and approaching `2π` at the next.
///
/// Uses the timestamp's own wall-clock time; no timezone conversion is applied.
pub fn time_of_day_angle(t: &NaiveDateTime) -> f64 {
    TAU * seconds_since_midnight(t) / SECONDS_PER_DAY
}

/// Circular encoding `(tx, ty) = (cos θ, sin θ)` of the time of day.
pub fn encode_time_of_day(t: &NaiveDateTime) -> (f64, f64) {
    let theta = time_of_day_angle(t);
    (theta.cos(), theta.sin())
}

/// Inverse of [`encode_time_of_day`]: seconds since midnight in `[0, 86400)`.
///
/// Also accepts non-unit vectors such as a circular mean; only the direction
/// matters. The zero vector decodes to midnight.
pub fn decode_time_of_day(tx: f64, ty: f64) -> f64 {
    let theta = ty.atan2(tx).rem_euclid(TAU);
    let seconds = SECONDS_PER_DAY * theta / TAU;
    // rem_euclid can round up to exactly TAU for tiny negative angles
    if seconds >= SECONDS_PER_DAY {
        0.0
    } else {
        seconds
    }
}

/// Build one feature row per trajectory observation, preserving order.
pub fn extract_features(trajectories: &[TrajectoryObservation]) -> Vec<FeatureRow> {
    let rows: Vec<FeatureRow> = trajectories
        .iter()
        .map(|obs| {
            let (tx, ty) = encode_time_of_day(&obs.position.t);
            FeatureRow {
                trajectory_id: obs.trajectory_id,
                device_id: obs.position.device_id,
                t: obs.position.t,
                pos: obs.position.pos,
                dt: obs.dt,
                velocity: obs.velocity,
                tx,
                ty,
            }
        })
        .collect();

    debug!("[Features] Extracted {} feature rows", rows.len());
    rows
}
