//! Quality filter applied before segmentation.
//!
//! Drops observations without a usable fix, collapses duplicate
//! `(device_id, t)` pairs, and optionally restricts the data to a
//! seasonal window of months.

use std::collections::HashSet;

use chrono::Datelike;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::{Observation, Position};

/// Inclusive range of calendar months, e.g. June through September for a
/// summer grazing season. `first > last` wraps around the new year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub first_month: u32,
    pub last_month: u32,
}

impl SeasonWindow {
    pub fn new(first_month: u32, last_month: u32) -> Result<Self> {
        let window = Self {
            first_month,
            last_month,
        };
        window.validate()?;
        Ok(window)
    }

    /// June through September.
    pub fn summer_grazing() -> Self {
        Self {
            first_month: 6,
            last_month: 9,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for month in [self.first_month, self.last_month] {
            if !(1..=12).contains(&month) {
                return Err(TrackError::InvalidConfig(format!(
                    "season month {month} is outside 1..=12"
                )));
            }
        }
        Ok(())
    }

    pub fn contains(&self, month: u32) -> bool {
        if self.first_month <= self.last_month {
            (self.first_month..=self.last_month).contains(&month)
        } else {
            month >= self.first_month || month <= self.last_month
        }
    }
}

/// Quality filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Keep only observations inside this month window. Default: None (all months)
    #[serde(default)]
    pub season: Option<SeasonWindow>,
}

/// Keep observations whose month falls inside `season`.
pub fn filter_season(observations: &[Observation], season: &SeasonWindow) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| season.contains(o.t.month()))
        .cloned()
        .collect()
}

/// Drop observations with a missing point or invalid coordinates.
pub fn remove_invalid_positions(observations: &[Observation]) -> Vec<Position> {
    observations
        .iter()
        .filter_map(|o| match o.pos {
            Some(pos) if pos.is_valid() => Some(Position {
                device_id: o.device_id,
                t: o.t,
                pos,
            }),
            _ => None,
        })
        .collect()
}

/// Keep one position per `(device_id, t)`.
///
/// Which duplicate survives is unspecified by contract; this keeps the first
/// one in input order. Input order is otherwise preserved.
pub fn remove_duplicates(positions: &[Position]) -> Vec<Position> {
    let mut seen = HashSet::with_capacity(positions.len());
    positions
        .iter()
        .filter(|p| seen.insert((p.device_id, p.t)))
        .copied()
        .collect()
}

/// Run the full quality filter: season window, invalid fixes, duplicates.
pub fn clean_observations(observations: &[Observation], config: &QualityConfig) -> Vec<Position> {
    let in_season;
    let candidates = match &config.season {
        Some(season) => {
            in_season = filter_season(observations, season);
            &in_season[..]
        }
        None => observations,
    };

    let valid = remove_invalid_positions(candidates);
    let cleaned = remove_duplicates(&valid);

    info!(
        "[Quality] {} observations -> {} in season -> {} valid -> {} unique",
        observations.len(),
        candidates.len(),
        valid.len(),
        cleaned.len()
    );

    cleaned
}
