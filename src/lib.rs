//! # Flocktrack
//!
//! Trajectory segmentation and behavioral clustering for irregularly sampled
//! GPS tracking data (livestock collars, wildlife tags, fleet trackers).
//!
//! This library provides:
//! - Quality filtering of raw position pings (invalid fixes, duplicate timestamps)
//! - Threshold-based trajectory segmentation with globally unique trajectory ids
//! - Movement features: velocity and a circular time-of-day encoding
//! - K-means clustering with an elbow diagnostic for choosing `k`
//! - Per-cluster and rollup summaries using circular statistics
//! - Sampling interval density analysis
//!
//! ## Features
//!
//! - **`parallel`** - Parallel k-means assignment with rayon
//! - **`cli`** - The `flocktrack` command line tool
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use flocktrack::{AnalysisSession, GpsPoint, Observation, PipelineConfig};
//!
//! let day = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
//! let observations: Vec<Observation> = (0..48)
//!     .map(|i| {
//!         let t = day.and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::minutes(30 * i);
//!         let point = GpsPoint::new(63.4 + i as f64 * 1e-4, 11.2);
//!         Observation::new(1, t, Some(point))
//!     })
//!     .collect();
//!
//! let mut session = AnalysisSession::new(PipelineConfig::default());
//! let features = session.prepare(&observations).unwrap();
//! assert_eq!(features.len(), 47); // the device's first ping opens a trajectory and is dropped
//!
//! let summaries = session.cluster(2).unwrap();
//! assert!(summaries.last().unwrap().is_rollup());
//! ```

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackError};

// Geographic utilities (distances, elapsed time, time of day)
pub mod geo_utils;

// Position stream sources (in-memory, JSON Lines)
pub mod source;
pub use source::{JsonLinesSource, PositionSource};

// Quality filter: invalid fixes, duplicate timestamps, season window
pub mod quality;
pub use quality::{QualityConfig, SeasonWindow, clean_observations};

// Trajectory segmentation engine
pub mod segmentation;
pub use segmentation::{
    Segmentation, SegmentationConfig, SegmentationStats, identify_trajectories,
    segment_observations,
};

// Feature extraction (velocity, circular time of day)
pub mod features;
pub use features::{decode_time_of_day, encode_time_of_day, extract_features};

// K-means clustering
pub mod kmeans;
pub use kmeans::{KMeansConfig, KMeansModel};

// Cluster-count selection (elbow diagnostic)
pub mod elbow;
pub use elbow::{ElbowPoint, elbow_curve};

// Clustering and rollup aggregation
pub mod aggregation;
pub use aggregation::{ClusterSummary, ClusteredRow, cluster_features, summarize_clusters};

// Sampling interval density analysis
pub mod intervals;
pub use intervals::{IntervalConfig, IntervalDensity, interval_density, sampling_intervals};

// Caller-owned pipeline session
pub mod pipeline;
pub use pipeline::{AnalysisSession, PipelineConfig};

// Synthetic herd data for tests and benchmarks
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use flocktrack::GpsPoint;
/// let point = GpsPoint::new(63.41, 11.19); // Meråker
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A raw position ping as delivered by the position stream.
///
/// The point may be missing (the device reported no fix), and the same
/// `(device_id, t)` pair may occur more than once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub device_id: i64,
    pub t: NaiveDateTime,
    pub pos: Option<GpsPoint>,
}

impl Observation {
    pub fn new(device_id: i64, t: NaiveDateTime, pos: Option<GpsPoint>) -> Self {
        Self { device_id, t, pos }
    }
}

/// An observation that passed the quality filter: the point is present and valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub device_id: i64,
    pub t: NaiveDateTime,
    pub pos: GpsPoint,
}

/// A position with kinematics relative to the previous position of the same device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentedObservation {
    pub position: Position,
    /// Seconds since the previous position of this device (None for its first).
    pub dt: Option<f64>,
    /// Geodesic meters per second over `dt` (None when `dt` is None or zero).
    pub velocity: Option<f64>,
    /// True when this position starts a new trajectory.
    pub break_flag: bool,
}

/// A retained position, labeled with the trajectory it belongs to.
///
/// `dt` and `velocity` are always defined and within the segmentation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryObservation {
    pub trajectory_id: u64,
    pub position: Position,
    pub dt: f64,
    pub velocity: f64,
}

/// Clustering input: one row per trajectory observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub trajectory_id: u64,
    pub device_id: i64,
    pub t: NaiveDateTime,
    pub pos: GpsPoint,
    pub dt: f64,
    /// Speed in m/s
    pub velocity: f64,
    /// cos of the time-of-day angle
    pub tx: f64,
    /// sin of the time-of-day angle
    pub ty: f64,
}

impl FeatureRow {
    /// The `(velocity, tx, ty)` vector the clustering step operates on.
    pub fn vector(&self) -> [f64; 3] {
        [self.velocity, self.tx, self.ty]
    }

    pub fn month(&self) -> u32 {
        self.t.month()
    }

    pub fn year(&self) -> i32 {
        self.t.year()
    }
}
