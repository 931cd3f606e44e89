//! Geographic and temporal helpers shared by the pipeline stages.

use chrono::{NaiveDateTime, NaiveTime};
use geo::{Distance, Geodesic, Haversine, Point};

use crate::GpsPoint;

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

fn to_point(p: &GpsPoint) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

/// Distance in meters on the WGS84 ellipsoid (Karney's geodesic).
///
/// This is the distance used for segmentation velocities.
pub fn geodesic_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Geodesic::distance(to_point(p1), to_point(p2))
}

/// Great-circle distance in meters on a spherical earth.
///
/// Cheaper than [`geodesic_distance`] and within ~0.5% of it.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    Haversine::distance(to_point(p1), to_point(p2))
}

/// Signed elapsed seconds from `earlier` to `later`, with millisecond resolution.
pub fn elapsed_seconds(earlier: &NaiveDateTime, later: &NaiveDateTime) -> f64 {
    later.signed_duration_since(*earlier).num_milliseconds() as f64 / 1000.0
}

/// Seconds since local midnight of the timestamp's own calendar day.
pub fn seconds_since_midnight(t: &NaiveDateTime) -> f64 {
    let midnight = t.date().and_time(NaiveTime::MIN);
    elapsed_seconds(&midnight, t)
}
