//! # Analysis Session
//!
//! A caller-owned handle that runs the batch pipeline and keeps each stage's
//! materialized output:
//!
//! ```text
//! positions -> quality filter -> segmentation -> features -> { elbow | cluster }
//!                                            \-> sampling intervals
//! ```
//!
//! Every stage reads the previous stage's table and produces a new one; nothing
//! is mutated in place. Re-running [`AnalysisSession::prepare`] replaces all
//! stored tables.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::aggregation::{self, ClusterSummary, ClusteredRow};
use crate::elbow::{self, ElbowPoint};
use crate::error::{OptionExt, Result, TrackError};
use crate::features::extract_features;
use crate::intervals::{self, IntervalConfig, IntervalDensity};
use crate::kmeans::KMeansConfig;
use crate::quality::{QualityConfig, clean_observations};
use crate::segmentation::{Segmentation, SegmentationConfig, identify_trajectories};
use crate::source::PositionSource;
use crate::FeatureRow;

/// Configuration for every pipeline stage.
///
/// Loadable from JSON; missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub quality: QualityConfig,
    pub segmentation: SegmentationConfig,
    pub kmeans: KMeansConfig,
    pub intervals: IntervalConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content).map_err(|e| TrackError::Parse {
            line: e.line(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(season) = &self.quality.season {
            season.validate()?;
        }
        self.segmentation.validate()?;
        self.kmeans.validate()?;
        self.intervals.validate()?;
        Ok(())
    }
}

/// Caller-owned state for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    config: PipelineConfig,
    segmentation: Option<Segmentation>,
    features: Vec<FeatureRow>,
}

impl AnalysisSession {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            segmentation: None,
            features: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Segmentation output of the last [`prepare`](Self::prepare), if any.
    pub fn segmentation(&self) -> Option<&Segmentation> {
        self.segmentation.as_ref()
    }

    /// Feature table of the last [`prepare`](Self::prepare).
    pub fn features(&self) -> &[FeatureRow] {
        &self.features
    }

    /// Run quality filter, segmentation and feature extraction on a source.
    ///
    /// An empty result is not an error here; it surfaces as
    /// [`TrackError::EmptyInput`] from the clustering stages.
    pub fn prepare<S: PositionSource + ?Sized>(&mut self, source: &S) -> Result<&[FeatureRow]> {
        self.config.validate()?;

        let observations = source.observations()?;
        let positions = clean_observations(&observations, &self.config.quality);
        let segmentation = identify_trajectories(&positions, &self.config.segmentation);
        let features = extract_features(&segmentation.trajectories);

        if features.is_empty() {
            warn!(
                "[Pipeline] No feature rows from {} observations",
                observations.len()
            );
        } else {
            info!(
                "[Pipeline] Prepared {} feature rows in {} trajectories",
                features.len(),
                segmentation.stats.trajectories
            );
        }

        self.segmentation = Some(segmentation);
        self.features = features;
        Ok(&self.features)
    }

    /// Inertia for each candidate cluster count.
    pub fn elbow(&self) -> Result<Vec<ElbowPoint>> {
        elbow::elbow_curve(&self.features, &self.config.kmeans)
    }

    /// Cluster labels paired with their feature rows.
    pub fn assign_clusters(&self, k: usize) -> Result<Vec<ClusteredRow>> {
        aggregation::cluster_features(&self.features, k, &self.config.kmeans)
    }

    /// Cluster at `k` and summarize; the rollup row comes last.
    pub fn cluster(&self, k: usize) -> Result<Vec<ClusterSummary>> {
        let clustered = self.assign_clusters(k)?;
        aggregation::summarize_clusters(&clustered)
    }

    /// Density of within-trajectory sampling intervals.
    pub fn intervals(&self) -> Result<IntervalDensity> {
        self.intervals_with(&self.config.intervals)
    }

    /// Interval density with a one-off configuration.
    pub fn intervals_with(&self, config: &IntervalConfig) -> Result<IntervalDensity> {
        let segmentation = self.segmentation.as_ref().ok_or_empty_input("intervals")?;
        let samples = intervals::sampling_intervals(&segmentation.trajectories);
        intervals::interval_density(&samples, config)
    }
}
