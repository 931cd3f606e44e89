//! Synthetic herd tracking data for tests and benchmarks.
//!
//! Generates collar ping streams with a daily rhythm (resting at night,
//! grazing by day, brisk transit around dawn and dusk), schedule-dependent
//! reporting intervals, and injected defects with known counts: missing
//! fixes, duplicate timestamps, multi-day outages and GPS spikes.
//!
//! # Example
//!
//! ```rust
//! use flocktrack::synthetic::HerdScenario;
//!
//! let scenario = HerdScenario {
//!     device_count: 5,
//!     days: 3,
//!     ..HerdScenario::default()
//! };
//!
//! let dataset = scenario.generate();
//! assert_eq!(dataset.device_ids().len(), 5);
//! assert!(!dataset.observations.is_empty());
//! ```

use std::collections::BTreeSet;
use std::f64::consts::PI;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{GpsPoint, Observation};

// ============================================================================
// Types
// ============================================================================

/// Behavioral phase of a simulated animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Night rest, near-zero movement.
    Resting,
    /// Slow daytime movement.
    Grazing,
    /// Purposeful movement around dawn and dusk.
    Transit,
}

impl Behavior {
    /// Behavior for an hour of the day.
    pub fn at_hour(hour: u32) -> Self {
        match hour {
            22..=23 | 0..=4 => Behavior::Resting,
            5..=6 | 19..=21 => Behavior::Transit,
            _ => Behavior::Grazing,
        }
    }
}

/// Scenario configuration for generating a synthetic herd.
#[derive(Debug, Clone)]
pub struct HerdScenario {
    /// Center of the grazing area.
    pub origin: GpsPoint,
    /// First timestamp of every device.
    pub start: NaiveDateTime,
    /// Number of collared animals.
    pub device_count: usize,
    /// Length of the tracking period in days.
    pub days: u32,
    /// Reporting interval while resting, in minutes.
    pub rest_interval_minutes: i64,
    /// Reporting interval while grazing or moving, in minutes.
    pub active_interval_minutes: i64,
    /// Mean speeds in m/s for resting, grazing and transit.
    pub speeds: [f64; 3],
    /// GPS noise standard deviation in meters.
    pub gps_noise_sigma_meters: f64,
    /// Fraction of pings reported without a fix.
    pub missing_fix_fraction: f64,
    /// Fraction of pings emitted twice with the same timestamp.
    pub duplicate_fraction: f64,
    /// Devices (by index) that go silent for `outage_hours` halfway through.
    pub outage_devices: usize,
    /// Length of the injected outage in hours.
    pub outage_hours: i64,
    /// Number of GPS spikes (a ping displaced by tens of kilometers) per device.
    pub spikes_per_device: usize,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for HerdScenario {
    fn default() -> Self {
        Self {
            origin: GpsPoint::new(63.42, 11.75),
            start: NaiveDate::from_ymd_opt(2022, 6, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            device_count: 10,
            days: 14,
            rest_interval_minutes: 60,
            active_interval_minutes: 15,
            speeds: [0.01, 0.15, 1.2],
            gps_noise_sigma_meters: 5.0,
            missing_fix_fraction: 0.0,
            duplicate_fraction: 0.0,
            outage_devices: 0,
            outage_hours: 72,
            spikes_per_device: 0,
            seed: 42,
        }
    }
}

/// Ground truth about a generated dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetMetadata {
    /// Pings emitted, including duplicates and missing fixes.
    pub total_observations: usize,
    pub missing_fixes: usize,
    pub duplicates: usize,
    /// Outages longer than the default 48 hour threshold.
    pub injected_outages: usize,
    pub injected_spikes: usize,
}

/// A complete synthetic dataset.
pub struct SyntheticDataset {
    pub observations: Vec<Observation>,
    pub metadata: DatasetMetadata,
}

impl SyntheticDataset {
    pub fn device_ids(&self) -> BTreeSet<i64> {
        self.observations.iter().map(|o| o.device_id).collect()
    }
}

// ============================================================================
// Coordinate Helpers
// ============================================================================

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

fn meters_to_deg_lng(meters: f64, latitude: f64) -> f64 {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * latitude.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-10 {
        return 0.0;
    }
    meters / meters_per_deg_lng
}

fn offset(p: &GpsPoint, north_m: f64, east_m: f64) -> GpsPoint {
    GpsPoint::new(
        p.latitude + meters_to_deg_lat(north_m),
        p.longitude + meters_to_deg_lng(east_m, p.latitude),
    )
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

// ============================================================================
// Scenario Implementation
// ============================================================================

impl HerdScenario {
    /// Generate a complete synthetic dataset from this scenario.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut observations = Vec::new();
        let mut metadata = DatasetMetadata::default();

        let end = self.start + Duration::days(i64::from(self.days));

        for device_idx in 0..self.device_count {
            let device_id = 1000 + device_idx as i64;

            // Scatter animals around the origin
            let mut position = offset(
                &self.origin,
                rng.gen_range(-2000.0..2000.0),
                rng.gen_range(-2000.0..2000.0),
            );
            let mut heading: f64 = rng.gen_range(0.0..(2.0 * PI));

            let outage_start = (device_idx < self.outage_devices)
                .then(|| self.start + (end - self.start) / 2);
            if outage_start.is_some() && self.outage_hours > 48 {
                metadata.injected_outages += 1;
            }

            let mut pings: Vec<(NaiveDateTime, GpsPoint)> = Vec::new();
            let mut t = self.start;

            while t < end {
                let behavior = Behavior::at_hour(t.hour());
                let interval = match behavior {
                    Behavior::Resting => self.rest_interval_minutes,
                    _ => self.active_interval_minutes,
                };

                pings.push((t, position));

                // Advance the animal to the next ping
                let mean_speed = match behavior {
                    Behavior::Resting => self.speeds[0],
                    Behavior::Grazing => self.speeds[1],
                    Behavior::Transit => self.speeds[2],
                };
                heading += rng.gen_range(-0.6..0.6);
                let speed = (mean_speed * (1.0 + 0.3 * gaussian(&mut rng))).max(0.0);
                let step = speed * (interval * 60) as f64;
                position = offset(&position, step * heading.sin(), step * heading.cos());

                // Drift back toward the origin so the herd stays in its area
                let pull = 0.02;
                position = GpsPoint::new(
                    position.latitude + (self.origin.latitude - position.latitude) * pull,
                    position.longitude + (self.origin.longitude - position.longitude) * pull,
                );

                t += Duration::minutes(interval);
                if let Some(outage) = outage_start {
                    if t >= outage && t < outage + Duration::hours(self.outage_hours) {
                        t = outage + Duration::hours(self.outage_hours);
                    }
                }
            }

            // GPS spikes: displace a few interior pings far away
            if pings.len() > 2 {
                for _ in 0..self.spikes_per_device {
                    let idx = rng.gen_range(1..pings.len() - 1);
                    let bearing: f64 = rng.gen_range(0.0..(2.0 * PI));
                    pings[idx].1 = offset(
                        &pings[idx].1,
                        40_000.0 * bearing.sin(),
                        40_000.0 * bearing.cos(),
                    );
                    metadata.injected_spikes += 1;
                }
            }

            for (t, point) in pings {
                let noisy = offset(
                    &point,
                    gaussian(&mut rng) * self.gps_noise_sigma_meters,
                    gaussian(&mut rng) * self.gps_noise_sigma_meters,
                );

                let missing = rng.r#gen::<f64>() < self.missing_fix_fraction;
                let pos = if missing {
                    metadata.missing_fixes += 1;
                    None
                } else {
                    Some(noisy)
                };
                observations.push(Observation::new(device_id, t, pos));

                if rng.r#gen::<f64>() < self.duplicate_fraction {
                    let jitter = offset(&noisy, 1.0, 1.0);
                    observations.push(Observation::new(device_id, t, Some(jitter)));
                    metadata.duplicates += 1;
                }
            }
        }

        metadata.total_observations = observations.len();
        SyntheticDataset {
            observations,
            metadata,
        }
    }
}
