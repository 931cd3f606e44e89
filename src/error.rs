//! Unified error handling for the analysis pipeline.
//!
//! Invalid positions and undefined kinematics are absorbed by the stages that
//! meet them (the quality filter drops them, segmentation flags them as breaks).
//! Only conditions the caller must act on are surfaced here.

use thiserror::Error;

/// Errors surfaced to callers of the pipeline.
#[derive(Error, Debug)]
pub enum TrackError {
    /// A stage that needs at least one row received none.
    #[error("empty input: no rows reached the {stage} stage")]
    EmptyInput { stage: &'static str },

    /// Requested cluster count is outside `1..=rows`.
    #[error("invalid cluster count {k}: must be between 1 and {rows} (number of feature rows)")]
    InvalidClusterCount { k: usize, rows: usize },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Not enough usable samples for a statistical estimate.
    #[error("insufficient data: need {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// A position record could not be decoded.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Conversions from `Option` into pipeline errors.
pub trait OptionExt<T> {
    /// Map `None` to [`TrackError::EmptyInput`] for the named stage.
    fn ok_or_empty_input(self, stage: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_empty_input(self, stage: &'static str) -> Result<T> {
        self.ok_or(TrackError::EmptyInput { stage })
    }
}
