//! Sampling interval analysis.
//!
//! Tracking collars switch between reporting schedules (e.g. every 15 minutes
//! while moving, every few hours while idle). The distribution of
//! within-trajectory intervals exposes those schedules as peaks in a kernel
//! density estimate over `log2(dt / max_interval)`.
//!
//! Only the numeric series is produced here; plotting is up to the consumer.

use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::TrajectoryObservation;
use crate::error::{Result, TrackError};
use crate::geo_utils::elapsed_seconds;

/// Configuration for the interval density estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// KDE bandwidth factor, scaled by the sample standard deviation. Default: 0.2
    pub bandwidth: f64,
    /// Interval that maps to `log2 = 0`, in hours. Default: 48.0
    pub max_hours: f64,
    /// Lower end of the evaluation grid in log2 units. Default: -20.0
    pub grid_min: f64,
    /// Upper end of the evaluation grid in log2 units. Default: 0.0
    pub grid_max: f64,
    /// Number of grid points. Default: 500
    pub grid_points: usize,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            bandwidth: 0.2,
            max_hours: 48.0,
            grid_min: -20.0,
            grid_max: 0.0,
            grid_points: 500,
        }
    }
}

impl IntervalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return Err(TrackError::InvalidConfig(format!(
                "bandwidth must be positive, got {}",
                self.bandwidth
            )));
        }
        if !(self.max_hours.is_finite() && self.max_hours > 0.0) {
            return Err(TrackError::InvalidConfig(format!(
                "max_hours must be positive, got {}",
                self.max_hours
            )));
        }
        if !(self.grid_min < self.grid_max) || self.grid_points < 2 {
            return Err(TrackError::InvalidConfig(
                "interval grid needs grid_min < grid_max and at least 2 points".to_string(),
            ));
        }
        Ok(())
    }

    fn max_seconds(&self) -> f64 {
        self.max_hours * 3600.0
    }
}

/// A local maximum of the interval density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalPeak {
    /// Position on the grid, `log2(dt / max_interval)`
    pub log2_ratio: f64,
    /// Interval at the peak in seconds
    pub interval_seconds: f64,
    pub density: f64,
}

/// Density curve over the log-interval grid plus its peaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalDensity {
    pub grid: Vec<f64>,
    pub density: Vec<f64>,
    pub peaks: Vec<IntervalPeak>,
    /// Finite samples that went into the estimate
    pub samples: usize,
}

/// Elapsed seconds between consecutive rows of the same trajectory.
///
/// The first retained row of a trajectory has no predecessor within it and
/// contributes nothing. Expects rows grouped by trajectory and time-ordered,
/// as produced by segmentation.
pub fn sampling_intervals(trajectories: &[TrajectoryObservation]) -> Vec<f64> {
    trajectories
        .chunk_by(|a, b| a.trajectory_id == b.trajectory_id)
        .flat_map(|run| {
            run.windows(2)
                .map(|w| elapsed_seconds(&w[0].position.t, &w[1].position.t))
        })
        .collect()
}

fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

/// Indices of local maxima. Flat-topped peaks report their middle index.
pub fn find_peaks(values: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < values.len() {
        if values[i] > values[i - 1] {
            let mut j = i;
            while j + 1 < values.len() && values[j + 1] == values[i] {
                j += 1;
            }
            if j + 1 < values.len() && values[j + 1] < values[i] {
                peaks.push((i + j) / 2);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    peaks
}

/// Gaussian kernel density of `log2(dt / max_interval)` on an even grid.
///
/// Zero intervals (log of zero) are dropped. Needs at least two finite,
/// non-identical samples.
pub fn interval_density(intervals: &[f64], config: &IntervalConfig) -> Result<IntervalDensity> {
    config.validate()?;

    let max_seconds = config.max_seconds();
    let samples: Vec<f64> = intervals
        .iter()
        .map(|dt| (dt / max_seconds).log2())
        .filter(|f| f.is_finite())
        .collect();

    if samples.len() < 2 {
        return Err(TrackError::InsufficientData {
            required: 2,
            available: samples.len(),
        });
    }

    let sigma = config.bandwidth * sample_std(&samples);
    if !(sigma > 0.0) {
        return Err(TrackError::InsufficientData {
            required: 2,
            available: 1,
        });
    }

    let n = samples.len() as f64;
    let norm = 1.0 / (n * sigma * (2.0 * PI).sqrt());
    let step = (config.grid_max - config.grid_min) / (config.grid_points - 1) as f64;

    let grid: Vec<f64> = (0..config.grid_points)
        .map(|i| config.grid_min + i as f64 * step)
        .collect();
    let density: Vec<f64> = grid
        .iter()
        .map(|x| {
            norm * samples
                .iter()
                .map(|s| (-0.5 * ((x - s) / sigma).powi(2)).exp())
                .sum::<f64>()
        })
        .collect();

    let peaks: Vec<IntervalPeak> = find_peaks(&density)
        .into_iter()
        .map(|idx| IntervalPeak {
            log2_ratio: grid[idx],
            interval_seconds: grid[idx].exp2() * max_seconds,
            density: density[idx],
        })
        .collect();

    debug!(
        "[Intervals] {} samples, bandwidth sigma {:.4}, {} peaks",
        samples.len(),
        sigma,
        peaks.len()
    );

    Ok(IntervalDensity {
        grid,
        density,
        peaks,
        samples: samples.len(),
    })
}
