//! Position stream sources.
//!
//! The pipeline consumes a single normalized stream of
//! `(device_id, timestamp, point-or-null)` records. Merging heterogeneous
//! device exports into that stream happens upstream; this module only
//! provides the trait seam plus an in-memory and a JSON Lines source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::{GpsPoint, Observation};

/// Anything that can produce a fully materialized observation table.
pub trait PositionSource {
    fn observations(&self) -> Result<Vec<Observation>>;
}

impl PositionSource for [Observation] {
    fn observations(&self) -> Result<Vec<Observation>> {
        Ok(self.to_vec())
    }
}

impl PositionSource for Vec<Observation> {
    fn observations(&self) -> Result<Vec<Observation>> {
        Ok(self.clone())
    }
}

/// Wire shape of one JSON Lines record.
///
/// Coordinates are flat nullable fields so that exports from tools that write
/// `null` for a missing fix load without preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    pub device_id: i64,
    pub t: NaiveDateTime,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
}

impl From<PositionRecord> for Observation {
    fn from(record: PositionRecord) -> Self {
        let pos = match (record.latitude, record.longitude) {
            (Some(lat), Some(lng)) => Some(GpsPoint::new(lat, lng)),
            _ => None,
        };
        Observation::new(record.device_id, record.t, pos)
    }
}

impl From<&Observation> for PositionRecord {
    fn from(obs: &Observation) -> Self {
        Self {
            device_id: obs.device_id,
            t: obs.t,
            longitude: obs.pos.map(|p| p.longitude),
            latitude: obs.pos.map(|p| p.latitude),
        }
    }
}

/// Reads observations from a file with one JSON object per line.
///
/// Blank lines are skipped. A malformed line fails the whole read with
/// [`TrackError::Parse`] carrying its 1-based line number.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PositionSource for JsonLinesSource {
    fn observations(&self) -> Result<Vec<Observation>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let observations = parse_json_lines(reader)?;
        debug!(
            "[Source] Read {} observations from {}",
            observations.len(),
            self.path.display()
        );
        Ok(observations)
    }
}

/// Parse JSON Lines records from any buffered reader.
pub fn parse_json_lines<R: BufRead>(reader: R) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: PositionRecord =
            serde_json::from_str(trimmed).map_err(|e| TrackError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
        observations.push(record.into());
    }
    Ok(observations)
}
